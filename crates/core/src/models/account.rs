use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

use super::position::Position;

/// A user's portfolio: open positions, closed positions, and un-attributed
/// dividend income.
///
/// Position ids are unique across the union of both collections; selling
/// moves a position from open to closed as a single logical step, and only
/// when the close itself succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique id: `acct_<timestamp>_<slug>_<random>`
    pub id: String,

    /// Display name
    pub name: String,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Positions still held, in insertion order
    pub open_positions: Vec<Position>,

    /// Positions that have been sold, in sell order
    pub closed_positions: Vec<Position>,

    /// Running total of dividends not tied to any position
    pub total_dividends: f64,
}

impl Account {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let name = name.into();
        let slug = name.trim().replace(' ', "_");
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("acct_{}_{}_{}", now.format("%Y%m%d%H%M%S"), slug, &suffix[..8]),
            name,
            created_at: now,
            last_updated: now,
            open_positions: Vec::new(),
            closed_positions: Vec::new(),
            total_dividends: 0.0,
        }
    }

    // ── Position collection ─────────────────────────────────────────

    pub fn add_position(&mut self, position: Position) {
        self.open_positions.push(position);
        self.last_updated = Utc::now();
    }

    /// Find an open position by id. Linear scan; N is small.
    pub fn position(&self, position_id: &str) -> Option<&Position> {
        self.open_positions.iter().find(|p| p.id == position_id)
    }

    pub fn position_mut(&mut self, position_id: &str) -> Option<&mut Position> {
        self.open_positions.iter_mut().find(|p| p.id == position_id)
    }

    pub fn closed_position(&self, position_id: &str) -> Option<&Position> {
        self.closed_positions.iter().find(|p| p.id == position_id)
    }

    /// Remove an open position. `false` when the id is unknown.
    pub fn remove_position(&mut self, position_id: &str) -> bool {
        let Some(idx) = self.open_positions.iter().position(|p| p.id == position_id) else {
            return false;
        };
        self.open_positions.remove(idx);
        self.last_updated = Utc::now();
        true
    }

    /// Remove a closed position from the history. `false` when unknown.
    pub fn remove_closed_position(&mut self, position_id: &str) -> bool {
        let Some(idx) = self
            .closed_positions
            .iter()
            .position(|p| p.id == position_id)
        else {
            return false;
        };
        self.closed_positions.remove(idx);
        self.last_updated = Utc::now();
        true
    }

    /// Sell an open position: close it and move it to the closed collection.
    ///
    /// The removal from open and the append to closed are one logical step;
    /// when the close fails (unknown id, non-positive price, already closed)
    /// the open collection is left untouched.
    pub fn sell_position(
        &mut self,
        position_id: &str,
        selling_price: f64,
        at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let idx = self
            .open_positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;

        self.open_positions[idx].close(selling_price, at)?;

        let sold = self.open_positions.remove(idx);
        self.closed_positions.push(sold);
        self.last_updated = Utc::now();
        Ok(())
    }

    // ── Open-position aggregates ────────────────────────────────────

    /// Sum of current values over open positions.
    pub fn total_value(&self) -> f64 {
        self.open_positions.iter().map(|p| p.current_value).sum()
    }

    /// Sum of invested amounts over open positions.
    pub fn total_initial(&self) -> f64 {
        self.open_positions
            .iter()
            .map(|p| p.initial_investment)
            .sum()
    }

    /// Portfolio-level performance in percent; 0 when nothing is invested.
    pub fn overall_performance(&self) -> f64 {
        let initial = self.total_initial();
        if initial > 0.0 {
            (self.total_value() - initial) / initial * 100.0
        } else {
            0.0
        }
    }

    // ── Closed-position aggregates ──────────────────────────────────
    // Computed from the stored selling price and profit, never a live query.

    /// Sum of shares × selling price over closed positions.
    pub fn realized_value(&self) -> f64 {
        self.closed_positions.iter().map(|p| p.realized_value()).sum()
    }

    /// Sum of invested amounts over closed positions.
    pub fn realized_initial(&self) -> f64 {
        self.closed_positions
            .iter()
            .map(|p| p.initial_investment)
            .sum()
    }

    /// Sum of recorded profits over closed positions.
    pub fn realized_profit(&self) -> f64 {
        self.closed_positions
            .iter()
            .filter_map(|p| p.profit)
            .sum()
    }

    /// Realized performance in percent; 0 when nothing was invested.
    pub fn realized_performance(&self) -> f64 {
        let initial = self.realized_initial();
        if initial > 0.0 {
            (self.realized_value() - initial) / initial * 100.0
        } else {
            0.0
        }
    }

    // ── Dividends ───────────────────────────────────────────────────

    /// Add un-attributed dividend income. Dividends are a flat running total,
    /// not itemized; the date is accepted for the audit trail but only moves
    /// `last_updated`.
    pub fn add_dividend(
        &mut self,
        amount: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Dividend amount must be positive, got {amount}"
            )));
        }
        self.total_dividends += amount;
        self.last_updated = at.unwrap_or_else(Utc::now);
        Ok(())
    }

    /// `true` when a position id exists in either collection.
    pub fn contains_position(&self, position_id: &str) -> bool {
        self.position(position_id).is_some() || self.closed_position(position_id).is_some()
    }
}
