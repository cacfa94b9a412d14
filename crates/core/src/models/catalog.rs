use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::account::Account;
use super::instrument::Instrument;
use super::settings::Settings;

/// The root object graph. Everything in here gets serialized into a session
/// snapshot: all accounts, every instrument reachable from their positions,
/// and the settings.
///
/// Instruments are keyed by symbol, so a symbol maps to exactly one entry and
/// positions referencing it share the same cached market data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// All tracked instruments, keyed by uppercase symbol
    pub instruments: HashMap<String, Instrument>,

    /// All accounts, in creation order
    pub accounts: Vec<Account>,

    /// User settings
    #[serde(default)]
    pub settings: Settings,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Instruments ─────────────────────────────────────────────────

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(&normalize_symbol(symbol))
    }

    pub fn instrument_mut(&mut self, symbol: &str) -> Option<&mut Instrument> {
        self.instruments.get_mut(&normalize_symbol(symbol))
    }

    pub fn contains_instrument(&self, symbol: &str) -> bool {
        self.instruments.contains_key(&normalize_symbol(symbol))
    }

    /// Register an instrument, replacing any existing entry for its symbol.
    pub fn insert_instrument(&mut self, instrument: Instrument) {
        self.instruments
            .insert(instrument.symbol.clone(), instrument);
    }

    /// Existing entry for `symbol`, or a freshly constructed empty one.
    /// Lookups always reuse an existing entry rather than re-fetching.
    pub fn instrument_or_insert(&mut self, symbol: &str) -> &mut Instrument {
        let key = normalize_symbol(symbol);
        self.instruments
            .entry(key.clone())
            .or_insert_with(|| Instrument::new(key))
    }

    /// Tracked symbols in deterministic (sorted) order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.instruments.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    // ── Accounts ────────────────────────────────────────────────────

    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    pub fn account_mut(&mut self, account_id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == account_id)
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn add_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    /// Remove an account by id. `false` when the id is unknown.
    pub fn remove_account(&mut self, account_id: &str) -> bool {
        let Some(idx) = self.accounts.iter().position(|a| a.id == account_id) else {
            return false;
        };
        self.accounts.remove(idx);
        true
    }

    // ── Consistency ─────────────────────────────────────────────────

    /// Re-link the object graph after loading a snapshot: every symbol
    /// referenced by a position resolves to exactly one instrument entry.
    /// A consistent snapshot already satisfies this; missing entries get an
    /// empty shell that the next refresh will populate.
    pub fn relink(&mut self) {
        let referenced: Vec<String> = self
            .accounts
            .iter()
            .flat_map(|a| {
                a.open_positions
                    .iter()
                    .chain(a.closed_positions.iter())
                    .map(|p| p.symbol.clone())
            })
            .collect();
        for symbol in referenced {
            self.instrument_or_insert(&symbol);
        }
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
