use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::chart::ChartPoint;
use super::price::{PricePoint, PriceSeries};

/// Default refresh interval: market data older than this is considered stale.
pub const DEFAULT_REFRESH_INTERVAL_SECS: i64 = 15 * 60;

/// Metadata fetched from a market-data provider alongside the price history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    /// Human-readable display name (e.g., "Acme Corp.")
    pub name: String,
    /// Quote currency reported by the provider (e.g., "USD")
    pub currency: String,
    /// Sector / classification, "Unknown" when the provider has none
    pub sector: String,
}

/// A tradable instrument and its cached market data.
///
/// Holds two overlapping, differently-sampled series: daily closes over a
/// long trailing range and hourly intraday quotes over a short one. The
/// series and metadata are only ever swapped wholesale on a proven-successful
/// refresh, so a failed fetch leaves the last good data in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker symbol, uppercased, unique within a catalog
    pub symbol: String,

    /// Display name (defaults to the symbol until a refresh succeeds)
    pub name: String,

    /// Quote currency
    pub currency: String,

    /// Sector / classification
    pub sector: String,

    /// Daily closing prices (trailing ~2 years)
    pub daily: PriceSeries,

    /// Hourly intraday quotes (trailing ~7 days)
    pub intraday: PriceSeries,

    /// When the series were last successfully refreshed
    pub last_refreshed: Option<DateTime<Utc>>,

    /// Staleness threshold in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: i64,
}

fn default_refresh_interval_secs() -> i64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Instrument {
    /// Create an empty instrument shell. Series stay empty until the first
    /// successful refresh.
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into().trim().to_uppercase();
        Self {
            name: symbol.clone(),
            symbol,
            currency: "EUR".to_string(),
            sector: "Unknown".to_string(),
            daily: PriceSeries::new(),
            intraday: PriceSeries::new(),
            last_refreshed: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::seconds(self.refresh_interval_secs)
    }

    /// Whether cached data is still fresh at `now` under the staleness policy.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.last_refreshed
            .is_some_and(|last| now - last < self.refresh_interval())
    }

    /// Atomically swap in a freshly fetched snapshot and stamp the refresh
    /// time. Only called once all provider fetches have succeeded.
    pub fn apply_refresh(
        &mut self,
        profile: InstrumentProfile,
        daily: Vec<PricePoint>,
        intraday: Vec<PricePoint>,
        now: DateTime<Utc>,
    ) {
        self.name = profile.name;
        self.currency = profile.currency;
        self.sector = profile.sector;
        self.daily.replace(daily);
        self.intraday.replace(intraday);
        self.last_refreshed = Some(now);
    }

    /// Most recent known price: the latest intraday close when it is strictly
    /// newer than the latest daily close, otherwise the latest daily close.
    /// `None` only when both series are empty.
    pub fn current_price(&self) -> Option<f64> {
        match (self.intraday.latest(), self.daily.latest()) {
            (Some(i), Some(d)) if i.timestamp > d.timestamp => Some(i.price),
            (Some(i), None) => Some(i.price),
            (_, Some(d)) => Some(d.price),
            (None, None) => None,
        }
    }

    /// Resolve the price as of an arbitrary point in time.
    ///
    /// Resolution order, day granularity on the UTC calendar:
    /// 1. intraday point on the same date, nearest in time (ties → earliest)
    /// 2. daily close on the exact date
    /// 3. latest daily close at or before the date (weekends/holidays)
    /// 4. earliest daily close (no history before the requested date)
    /// 5. `None` when the daily series is empty
    pub fn price_at(&self, at: DateTime<Utc>) -> Option<f64> {
        let date = at.date_naive();

        let same_day = self.intraday.points_on(date);
        if !same_day.is_empty() {
            // min_by_key keeps the first of equal minima; the slice is in
            // timestamp order, so ties resolve to the earliest point.
            let nearest = same_day
                .iter()
                .min_by_key(|p| (p.timestamp - at).num_seconds().abs())?;
            return Some(nearest.price);
        }

        if let Some(point) = self.daily.on_date(date) {
            return Some(point.price);
        }
        if let Some(point) = self.daily.latest_on_or_before(date) {
            return Some(point.price);
        }
        self.daily.earliest().map(|p| p.price)
    }

    /// The trailing `days` daily closes as chartable (date, price) points.
    /// Empty when there is no daily history.
    pub fn price_history(&self, days: usize) -> Vec<ChartPoint> {
        self.daily
            .tail(days)
            .iter()
            .map(|p| ChartPoint::new(p.date(), p.price))
            .collect()
    }

}
