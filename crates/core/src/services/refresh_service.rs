use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::instrument::{Instrument, InstrumentProfile};
use crate::models::price::PricePoint;
use crate::providers::registry::ProviderRegistry;
use crate::providers::traits::MarketDataProvider;
use crate::storage::instrument_store::InstrumentStore;

/// Trailing range of the daily series: ~2 years.
const DAILY_RANGE_DAYS: i64 = 730;
/// Trailing range of the hourly intraday series.
const INTRADAY_RANGE_DAYS: i64 = 7;

/// Everything one provider must deliver for a refresh to count.
struct FetchedData {
    profile: InstrumentProfile,
    daily: Vec<PricePoint>,
    intraday: Vec<PricePoint>,
}

/// Refreshes instrument market data under the time-based staleness policy.
///
/// A refresh is all-or-nothing: providers are tried in registry order, and
/// the first one that delivers profile, daily history and intraday history in
/// full wins. Until then the instrument keeps its last good data — a fetch
/// that fails halfway never leaves a half-updated instrument behind.
pub struct RefreshService {
    registry: ProviderRegistry,
    store: InstrumentStore,
}

impl RefreshService {
    pub fn new(registry: ProviderRegistry, store: InstrumentStore) -> Self {
        Self { registry, store }
    }

    /// Refresh an instrument's market data.
    ///
    /// No-op success when `force` is false and the cached data is still
    /// fresh. On success both series and metadata are swapped atomically,
    /// the refresh time is stamped, and the instrument snapshot is persisted
    /// (persist failure is logged, not fatal). On provider failure the
    /// instrument is left untouched and the last provider error propagates;
    /// callers treat this as non-fatal and keep serving stale data.
    pub async fn refresh(&self, instrument: &mut Instrument, force: bool) -> Result<(), CoreError> {
        let now = Utc::now();
        if !force && instrument.is_fresh(now) {
            return Ok(());
        }
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let mut last_error = CoreError::NoProvider;
        for provider in self.registry.providers() {
            match Self::fetch_all(provider.as_ref(), &instrument.symbol, now).await {
                Ok(fetched) => {
                    instrument.apply_refresh(fetched.profile, fetched.daily, fetched.intraday, now);
                    if let Err(e) = self.store.save(instrument) {
                        warn!(
                            "Failed to persist snapshot for {}: {e}",
                            instrument.symbol
                        );
                    }
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        "Provider {} failed for {}: {e}",
                        provider.name(),
                        instrument.symbol
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Fetch metadata plus both historical ranges from a single provider.
    /// Fails as a unit when any of the three calls fails.
    async fn fetch_all(
        provider: &dyn MarketDataProvider,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<FetchedData, CoreError> {
        let profile = provider.fetch_profile(symbol).await?;
        let daily = provider
            .fetch_daily_history(symbol, now - Duration::days(DAILY_RANGE_DAYS), now)
            .await?;
        let intraday = provider
            .fetch_intraday_history(symbol, now - Duration::days(INTRADAY_RANGE_DAYS), now)
            .await?;
        Ok(FetchedData {
            profile,
            daily,
            intraday,
        })
    }

    pub fn store(&self) -> &InstrumentStore {
        &self.store
    }
}
