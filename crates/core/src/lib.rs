pub mod errors;
pub mod input;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;
pub mod timeutil;

use chrono::{DateTime, Utc};
use log::warn;

use models::{
    catalog::Catalog,
    chart::ChartPoint,
    instrument::Instrument,
    summary::{AccountSummary, PositionSummary},
};
use providers::registry::ProviderRegistry;
use services::{
    refresh_service::RefreshService,
    valuation_service::{OpenRequest, ValuationService},
};
use storage::{instrument_store::InstrumentStore, session_store::SessionStore, StorageConfig};

use errors::CoreError;

/// Main entry point for the Invest Tracker core library.
///
/// Owns the catalog — every account and every tracked instrument — plus the
/// services that operate on it. The host process constructs exactly one of
/// these and loads snapshots into it; there is no ambient global state.
#[must_use]
pub struct InvestmentTracker {
    catalog: Catalog,
    refresh_service: RefreshService,
    valuation_service: ValuationService,
    session_store: SessionStore,
    session_id: String,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for InvestmentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestmentTracker")
            .field("session_id", &self.session_id)
            .field("accounts", &self.catalog.accounts.len())
            .field("instruments", &self.catalog.instruments.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl InvestmentTracker {
    /// Create a brand new empty tracker with default storage locations and
    /// the default provider stack.
    pub fn create_new() -> Self {
        Self::with_storage(StorageConfig::default())
    }

    /// Create an empty tracker with explicit storage locations.
    pub fn with_storage(config: StorageConfig) -> Self {
        Self::build(Catalog::new(), ProviderRegistry::new_with_defaults(), config)
    }

    /// Create a tracker with a custom provider registry (e.g., mocks in
    /// tests, or a different provider priority).
    pub fn with_providers(registry: ProviderRegistry, config: StorageConfig) -> Self {
        Self::build(Catalog::new(), registry, config)
    }

    fn build(catalog: Catalog, registry: ProviderRegistry, config: StorageConfig) -> Self {
        let session_id = Utc::now().format("%Y%m%d%H%M%S").to_string();
        Self {
            catalog,
            refresh_service: RefreshService::new(
                registry,
                InstrumentStore::new(config.instrument_dir),
            ),
            valuation_service: ValuationService::new(),
            session_store: SessionStore::new(config.session_dir),
            session_id,
            dirty: false,
        }
    }

    /// The id new snapshots are saved under when none is given.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// Create a new account. The name must be non-empty; returns the new
    /// account's id.
    pub fn add_account(&mut self, name: &str) -> Result<String, CoreError> {
        let name = input::validate_account_name(name)?;
        let account = models::account::Account::new(name, Utc::now());
        let id = account.id.clone();
        self.catalog.add_account(account);
        self.dirty = true;
        Ok(id)
    }

    /// Remove an account and everything in it.
    pub fn remove_account(&mut self, account_id: &str) -> Result<(), CoreError> {
        if !self.catalog.remove_account(account_id) {
            return Err(CoreError::AccountNotFound(account_id.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn account(&self, account_id: &str) -> Option<&models::account::Account> {
        self.catalog.account(account_id)
    }

    #[must_use]
    pub fn account_by_name(&self, name: &str) -> Option<&models::account::Account> {
        self.catalog.account_by_name(name)
    }

    #[must_use]
    pub fn accounts(&self) -> &[models::account::Account] {
        &self.catalog.accounts
    }

    // ── Instruments ─────────────────────────────────────────────────

    /// Get-or-create an instrument entry for a symbol and return the
    /// normalized symbol.
    ///
    /// Resolution order: existing in-memory entry → cached snapshot on disk →
    /// a fresh entry with a forced initial refresh. A failed initial refresh
    /// is logged and the empty entry is kept; a later refresh fills it in.
    pub async fn ensure_instrument(&mut self, symbol: &str) -> Result<String, CoreError> {
        let key = symbol.trim().to_uppercase();
        if key.is_empty() {
            return Err(CoreError::InvalidInput("Symbol must not be empty".into()));
        }
        if self.catalog.contains_instrument(&key) {
            return Ok(key);
        }

        let mut instrument = match self.refresh_service.store().load(&key) {
            Ok(Some(cached)) => cached,
            Ok(None) => Instrument::new(&key),
            Err(e) => {
                warn!("Failed to read cached data for {key}: {e}");
                Instrument::new(&key)
            }
        };
        if instrument.last_refreshed.is_none() {
            if let Err(e) = self.refresh_service.refresh(&mut instrument, true).await {
                warn!("Initial market data fetch failed for {key}: {e}");
            }
        }
        self.catalog.insert_instrument(instrument);
        self.dirty = true;
        Ok(key)
    }

    #[must_use]
    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.catalog.instrument(symbol)
    }

    /// Tracked symbols in deterministic (sorted) order.
    #[must_use]
    pub fn tracked_symbols(&self) -> Vec<String> {
        self.catalog.symbols()
    }

    /// The trailing `days` daily closes for an instrument.
    pub fn price_history(&self, symbol: &str, days: usize) -> Result<Vec<ChartPoint>, CoreError> {
        let instrument = self
            .catalog
            .instrument(symbol)
            .ok_or_else(|| CoreError::InstrumentNotFound(symbol.to_string()))?;
        Ok(instrument.price_history(days))
    }

    /// Resolve an instrument's price as of an arbitrary point in time.
    pub fn price_at(&self, symbol: &str, at: DateTime<Utc>) -> Result<Option<f64>, CoreError> {
        let instrument = self
            .catalog
            .instrument(symbol)
            .ok_or_else(|| CoreError::InstrumentNotFound(symbol.to_string()))?;
        Ok(instrument.price_at(at))
    }

    // ── Positions ───────────────────────────────────────────────────

    /// Open a position in an account. Ensures the instrument is tracked and
    /// its market data is within the freshness window, resolves shares and
    /// cost basis via the valuation precedence, and returns the new
    /// position's id.
    pub async fn open_position(
        &mut self,
        account_id: &str,
        symbol: &str,
        request: OpenRequest,
    ) -> Result<String, CoreError> {
        if request.shares.is_none()
            && (!request.invested_amount.is_finite() || request.invested_amount <= 0.0)
        {
            return Err(CoreError::InvalidInput(format!(
                "Invested amount must be positive, got {}",
                request.invested_amount
            )));
        }
        if request.shares.is_some_and(|s| !s.is_finite() || s < 0.0) {
            return Err(CoreError::InvalidInput(
                "Share count must be non-negative".into(),
            ));
        }
        if self.catalog.account(account_id).is_none() {
            return Err(CoreError::AccountNotFound(account_id.to_string()));
        }

        let key = self.ensure_instrument(symbol).await?;
        let default_currency = self.catalog.settings.default_currency.clone();
        let position = {
            let instrument = self
                .catalog
                .instrument_mut(&key)
                .ok_or_else(|| CoreError::InstrumentNotFound(key.clone()))?;
            // A disk-cached instrument may be days old; bring it up to date
            // under the staleness policy before deriving the cost basis.
            if let Err(e) = self.refresh_service.refresh(instrument, false).await {
                warn!("Market data refresh failed for {key}: {e}");
            }
            self.valuation_service
                .open_position(instrument, request, &default_currency)
        };

        let id = position.id.clone();
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        account.add_position(position);
        self.dirty = true;
        Ok(id)
    }

    /// Sell an open position: close it at `selling_price` and move it to the
    /// account's closed collection. Fails without side effects for unknown
    /// ids, non-positive prices, or an already-closed position.
    pub fn sell_position(
        &mut self,
        account_id: &str,
        position_id: &str,
        selling_price: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        account.sell_position(position_id, selling_price, at.unwrap_or_else(Utc::now))?;
        self.dirty = true;
        Ok(())
    }

    /// Remove an open position without selling it.
    pub fn remove_position(
        &mut self,
        account_id: &str,
        position_id: &str,
    ) -> Result<(), CoreError> {
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        if !account.remove_position(position_id) {
            return Err(CoreError::PositionNotFound(position_id.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove a closed position from the account's history.
    pub fn remove_closed_position(
        &mut self,
        account_id: &str,
        position_id: &str,
    ) -> Result<(), CoreError> {
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        if !account.remove_closed_position(position_id) {
            return Err(CoreError::PositionNotFound(position_id.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace the tags on an open position.
    pub fn set_position_tags(
        &mut self,
        account_id: &str,
        position_id: &str,
        tags: Vec<String>,
    ) -> Result<(), CoreError> {
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        let position = account
            .position_mut(position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;
        position.tags = tags;
        self.dirty = true;
        Ok(())
    }

    // ── Dividends ───────────────────────────────────────────────────

    /// Record un-attributed dividend income on an account. Rejects
    /// non-positive amounts, leaving the running total unchanged.
    pub fn add_dividend(
        &mut self,
        account_id: &str,
        amount: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        let account = self
            .catalog
            .account_mut(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        account.add_dividend(amount, at)?;
        self.dirty = true;
        Ok(())
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Revalue one open position: refresh the instrument's market data under
    /// the staleness policy (`force` bypasses it), then recompute the value.
    /// A failed refresh is logged and the stale value is kept. Returns the
    /// current value.
    pub async fn revalue_position(
        &mut self,
        account_id: &str,
        position_id: &str,
        force: bool,
    ) -> Result<f64, CoreError> {
        let Catalog {
            instruments,
            accounts,
            ..
        } = &mut self.catalog;
        let account = accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        let position = account
            .open_positions
            .iter_mut()
            .find(|p| p.id == position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;
        let instrument = instruments
            .entry(position.symbol.clone())
            .or_insert_with(|| Instrument::new(position.symbol.clone()));

        if let Err(e) = self.refresh_service.refresh(instrument, force).await {
            warn!("Market data refresh failed for {}: {e}", position.symbol);
        }
        let value = self.valuation_service.update_value(position, instrument);
        account.last_updated = Utc::now();
        self.dirty = true;
        Ok(value)
    }

    /// Revalue every open position in an account. Returns the account's
    /// total value afterwards.
    pub async fn revalue_account(
        &mut self,
        account_id: &str,
        force: bool,
    ) -> Result<f64, CoreError> {
        let Catalog {
            instruments,
            accounts,
            ..
        } = &mut self.catalog;
        let account = accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;

        for position in &mut account.open_positions {
            let instrument = instruments
                .entry(position.symbol.clone())
                .or_insert_with(|| Instrument::new(position.symbol.clone()));
            if let Err(e) = self.refresh_service.refresh(instrument, force).await {
                warn!("Market data refresh failed for {}: {e}", position.symbol);
            }
            self.valuation_service.update_value(position, instrument);
        }
        account.last_updated = Utc::now();
        self.dirty = true;
        Ok(account.total_value())
    }

    /// Revalue every open position in every account.
    pub async fn revalue_all(&mut self, force: bool) -> Result<(), CoreError> {
        let ids: Vec<String> = self.catalog.accounts.iter().map(|a| a.id.clone()).collect();
        for id in ids {
            self.revalue_account(&id, force).await?;
        }
        Ok(())
    }

    /// A position's value over the trailing `days` daily closes.
    pub fn position_performance_history(
        &self,
        account_id: &str,
        position_id: &str,
        days: usize,
    ) -> Result<Vec<ChartPoint>, CoreError> {
        let account = self
            .catalog
            .account(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        let position = account
            .position(position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;
        let instrument = self
            .catalog
            .instrument(&position.symbol)
            .ok_or_else(|| CoreError::InstrumentNotFound(position.symbol.clone()))?;
        Ok(self
            .valuation_service
            .performance_history(position, instrument, days))
    }

    // ── Summaries ───────────────────────────────────────────────────

    /// Aggregated totals for one account.
    pub fn account_summary(&self, account_id: &str) -> Result<AccountSummary, CoreError> {
        let account = self
            .catalog
            .account(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        Ok(AccountSummary::of(account))
    }

    /// Display-ready summaries of an account's open positions.
    pub fn position_summaries(&self, account_id: &str) -> Result<Vec<PositionSummary>, CoreError> {
        let account = self
            .catalog
            .account(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        Ok(account
            .open_positions
            .iter()
            .map(|p| PositionSummary::of(p, self.catalog.instrument(&p.symbol)))
            .collect())
    }

    /// Display-ready summaries of an account's closed positions.
    pub fn closed_position_summaries(
        &self,
        account_id: &str,
    ) -> Result<Vec<PositionSummary>, CoreError> {
        let account = self
            .catalog
            .account(account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        Ok(account
            .closed_positions
            .iter()
            .map(|p| PositionSummary::of(p, self.catalog.instrument(&p.symbol)))
            .collect())
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Set the default currency assumed for new positions (e.g., "EUR").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_default_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        let trimmed = currency.trim().to_uppercase();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::InvalidInput(format!(
                "Invalid currency code '{currency}': must be exactly 3 ASCII letters (e.g., EUR, USD)"
            )));
        }
        self.catalog.settings.default_currency = trimmed;
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> &models::settings::Settings {
        &self.catalog.settings
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Save the catalog as a session snapshot. Uses the tracker's session id
    /// when none is given; returns the id saved under. Clears the
    /// unsaved-changes flag on success.
    pub fn save_session(&mut self, session_id: Option<&str>) -> Result<String, CoreError> {
        let id = session_id.unwrap_or(&self.session_id).to_string();
        self.session_store.save(&self.catalog, &id)?;
        self.dirty = false;
        Ok(id)
    }

    /// Load a session snapshot into this tracker, replacing the catalog.
    /// Position→instrument references are re-linked after the load.
    pub fn load_session(&mut self, session_id: &str) -> Result<(), CoreError> {
        let mut catalog = self
            .session_store
            .load(session_id)?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        catalog.relink();
        self.catalog = catalog;
        self.session_id = session_id.to_string();
        self.dirty = false;
        Ok(())
    }

    /// All saved session ids, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>, CoreError> {
        self.session_store.list()
    }

    /// Returns `true` if the catalog has been modified since the last save
    /// or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Export the full catalog as pretty JSON (for debugging/display).
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.catalog)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize catalog: {e}")))
    }
}
