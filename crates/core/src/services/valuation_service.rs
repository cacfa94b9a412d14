use chrono::{DateTime, Utc};
use log::warn;

use crate::models::chart::ChartPoint;
use crate::models::instrument::Instrument;
use crate::models::position::Position;

/// Parameters for opening a position, as collected at the boundary.
/// `invested_amount` and `shares` are the two entry modes; the rest refine
/// how the share count and cost basis are derived.
#[derive(Debug, Clone, Default)]
pub struct OpenRequest {
    pub invested_amount: f64,
    pub currency: Option<String>,
    pub shares: Option<f64>,
    pub purchase_price: Option<f64>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Derives share counts and cost basis from partial user input, and keeps
/// position values in sync with instrument prices.
///
/// Pure business logic — no I/O. Refreshing the instrument happens before
/// these calls.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Open a position against an instrument, resolving the share count via
    /// strict precedence:
    ///
    /// 1. explicit share count — used as-is, invested amount taken as given
    /// 2. explicit positive purchase price — shares = amount / price
    /// 3. price as of the purchase timestamp, when one was supplied
    /// 4. current instrument price
    /// 5. none of the above resolves → 0 shares (degenerate but valid; the
    ///    value stays at the invested amount until a refresh succeeds)
    ///
    /// The purchase timestamp defaults to now.
    pub fn open_position(
        &self,
        instrument: &Instrument,
        request: OpenRequest,
        default_currency: &str,
    ) -> Position {
        let opened_at = request.purchased_at.unwrap_or_else(Utc::now);
        let currency = request
            .currency
            .unwrap_or_else(|| default_currency.to_string());

        let explicit_price = request.purchase_price.filter(|p| {
            let valid = p.is_finite() && *p > 0.0;
            if !valid {
                warn!(
                    "Ignoring non-positive purchase price {p} for {}",
                    instrument.symbol
                );
            }
            valid
        });

        let (shares, price) = if let Some(shares) = request.shares {
            (shares.max(0.0), explicit_price)
        } else if let Some(price) = explicit_price {
            (request.invested_amount / price, Some(price))
        } else if let Some(price) = request
            .purchased_at
            .and_then(|at| instrument.price_at(at))
            .filter(|p| *p > 0.0)
        {
            (request.invested_amount / price, Some(price))
        } else if let Some(price) = instrument.current_price().filter(|p| *p > 0.0) {
            (request.invested_amount / price, Some(price))
        } else {
            (0.0, None)
        };

        let mut position = Position::new(
            &instrument.symbol,
            request.invested_amount,
            currency,
            shares,
            price,
            opened_at,
            request.tags,
        );
        self.update_value(&mut position, instrument);
        position
    }

    /// Recompute a position's current value from the instrument's latest
    /// price. When no price is available the previous value is kept —
    /// stale-but-present beats missing. Returns the (possibly unchanged)
    /// current value.
    pub fn update_value(&self, position: &mut Position, instrument: &Instrument) -> f64 {
        if let Some(price) = instrument.current_price() {
            position.current_value = position.number_of_shares * price;
        }
        position.current_value
    }

    /// The position's value over the trailing `days` daily closes:
    /// close × shares, pointwise. Empty when the position holds no shares or
    /// the instrument has no daily history.
    pub fn performance_history(
        &self,
        position: &Position,
        instrument: &Instrument,
        days: usize,
    ) -> Vec<ChartPoint> {
        if position.number_of_shares <= 0.0 {
            return Vec::new();
        }
        instrument
            .price_history(days)
            .into_iter()
            .map(|p| ChartPoint::new(p.date, p.value * position.number_of_shares))
            .collect()
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
