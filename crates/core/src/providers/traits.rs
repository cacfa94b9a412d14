use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::instrument::InstrumentProfile;
use crate::models::price::PricePoint;

/// Trait abstraction for market-data providers.
///
/// Each backend (Yahoo Finance, Stooq) implements this trait. If an API stops
/// working or changes, only that one implementation is replaced — the refresh
/// logic and everything above it is untouched.
///
/// All returned timestamps are UTC; implementations normalize at ingestion
/// via `timeutil`. Any call may fail (network, unknown symbol) — a failed
/// call must not have side effects.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch instrument metadata: display name, currency, classification.
    async fn fetch_profile(&self, symbol: &str) -> Result<InstrumentProfile, CoreError>;

    /// Fetch daily closing prices for a time range, ordered by timestamp.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Fetch hourly intraday quotes for a time range, ordered by timestamp.
    async fn fetch_intraday_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError>;
}
