use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::instrument::Instrument;
use super::position::Position;

/// Display-ready snapshot of a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub id: String,
    pub symbol: String,
    /// Instrument display name, or the symbol when the instrument is unknown
    pub instrument_name: String,
    pub initial_investment: f64,
    pub currency: String,
    pub number_of_shares: f64,
    pub purchase_price: Option<f64>,
    /// Latest known market price, when the instrument has any data
    pub current_price: Option<f64>,
    pub current_value: f64,
    pub performance_pct: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub is_sold: bool,
    pub selling_price: Option<f64>,
    pub profit: Option<f64>,
}

impl PositionSummary {
    pub fn of(position: &Position, instrument: Option<&Instrument>) -> Self {
        Self {
            id: position.id.clone(),
            symbol: position.symbol.clone(),
            instrument_name: instrument
                .map(|i| i.name.clone())
                .unwrap_or_else(|| position.symbol.clone()),
            initial_investment: position.initial_investment,
            currency: position.currency.clone(),
            number_of_shares: position.number_of_shares,
            purchase_price: position.purchase_price,
            current_price: instrument.and_then(|i| i.current_price()),
            current_value: position.current_value,
            performance_pct: position.performance(),
            opened_at: position.opened_at,
            closed_at: position.closed_at,
            tags: position.tags.clone(),
            is_sold: position.is_sold,
            selling_price: position.selling_price,
            profit: position.profit,
        }
    }
}

/// Aggregated view of one account: counts, open-position totals and
/// realized totals over the closed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub open_positions: usize,
    pub closed_positions: usize,
    pub total_value: f64,
    pub total_initial: f64,
    pub overall_performance_pct: f64,
    pub realized_value: f64,
    pub realized_initial: f64,
    pub realized_profit: f64,
    pub realized_performance_pct: f64,
    pub total_dividends: f64,
}

impl AccountSummary {
    pub fn of(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            created_at: account.created_at,
            last_updated: account.last_updated,
            open_positions: account.open_positions.len(),
            closed_positions: account.closed_positions.len(),
            total_value: account.total_value(),
            total_initial: account.total_initial(),
            overall_performance_pct: account.overall_performance(),
            realized_value: account.realized_value(),
            realized_initial: account.realized_initial(),
            realized_profit: account.realized_profit(),
            realized_performance_pct: account.realized_performance(),
            total_dividends: account.total_dividends,
        }
    }
}
