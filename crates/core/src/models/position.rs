use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// An investment in a single instrument: either open (still held) or closed
/// (sold, with realized profit recorded).
///
/// Every field has a value from construction onward; closing is the only
/// state transition and it happens exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Unique id: `pos_<timestamp>_<symbol>_<random>`
    pub id: String,

    /// Symbol of the backing instrument (resolved through the catalog)
    pub symbol: String,

    /// Amount originally invested (cost basis)
    pub initial_investment: f64,

    /// Currency of the invested amount
    pub currency: String,

    /// Shares held; 0 for the degenerate no-price-resolved case
    pub number_of_shares: f64,

    /// Price per share used at open, when one was given or resolved
    pub purchase_price: Option<f64>,

    /// When the position was opened
    pub opened_at: DateTime<Utc>,

    /// When the position was closed, once sold
    pub closed_at: Option<DateTime<Utc>>,

    /// Free-text tags
    pub tags: Vec<String>,

    /// Whether the position has been sold
    pub is_sold: bool,

    /// Price per share at close, once sold
    pub selling_price: Option<f64>,

    /// Realized profit (shares × selling price − initial), once sold
    pub profit: Option<f64>,

    /// Last computed market value; starts at the invested amount
    pub current_value: f64,
}

impl Position {
    /// Create an open position. Share count and purchase price are resolved
    /// by the valuation service before this is called.
    pub fn new(
        symbol: impl Into<String>,
        initial_investment: f64,
        currency: impl Into<String>,
        number_of_shares: f64,
        purchase_price: Option<f64>,
        opened_at: DateTime<Utc>,
        tags: Vec<String>,
    ) -> Self {
        let symbol = symbol.into().trim().to_uppercase();
        let id = Self::derive_id(&symbol, opened_at);
        Self {
            id,
            symbol,
            initial_investment,
            currency: currency.into(),
            number_of_shares,
            purchase_price,
            opened_at,
            closed_at: None,
            tags,
            is_sold: false,
            selling_price: None,
            profit: None,
            current_value: initial_investment,
        }
    }

    /// Id stem is the open timestamp plus the symbol; the random suffix keeps
    /// ids unique when two positions on the same instrument open within the
    /// same second.
    fn derive_id(symbol: &str, opened_at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "pos_{}_{}_{}",
            opened_at.format("%Y%m%d%H%M%S"),
            symbol,
            &suffix[..8]
        )
    }

    /// Unrealized performance in percent relative to the invested amount.
    /// Defined as 0 when nothing was invested (no division by zero).
    pub fn performance(&self) -> f64 {
        if self.initial_investment > 0.0 {
            (self.current_value - self.initial_investment) / self.initial_investment * 100.0
        } else {
            0.0
        }
    }

    /// Close the position at `selling_price`, recording realized profit.
    ///
    /// Fails without touching any field when the position is already closed
    /// or the price is not positive. The open→closed transition happens
    /// exactly once; a second attempt reports `AlreadyClosed` and leaves the
    /// first close's values intact.
    pub fn close(&mut self, selling_price: f64, at: DateTime<Utc>) -> Result<(), CoreError> {
        if self.is_sold {
            return Err(CoreError::AlreadyClosed(self.id.clone()));
        }
        if !selling_price.is_finite() || selling_price <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Selling price must be positive, got {selling_price}"
            )));
        }

        self.is_sold = true;
        self.selling_price = Some(selling_price);
        self.closed_at = Some(at);
        self.profit = Some(self.number_of_shares * selling_price - self.initial_investment);
        Ok(())
    }

    /// Realized value at close: shares × selling price. 0 while open.
    pub fn realized_value(&self) -> f64 {
        self.selling_price
            .map(|p| self.number_of_shares * p)
            .unwrap_or(0.0)
    }
}
