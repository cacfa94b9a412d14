use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentProfile;
use crate::models::price::PricePoint;
use crate::timeutil;

use super::traits::MarketDataProvider;

const BASE_URL: &str = "https://stooq.com/q/d/l/";

/// Stooq provider — degraded fallback when Yahoo Finance is unavailable.
///
/// - **Free**: no API key, public CSV download endpoint.
/// - **Coverage**: global equities and indices at daily granularity.
/// - **Limits**: no intraday endpoint and no metadata endpoint, so the
///   profile is synthesized from the symbol and the intraday history comes
///   back empty. Current-price queries then fall back to the latest daily
///   close, which is exactly the daily-only resolution path.
pub struct StooqProvider {
    client: Client,
}

impl StooqProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    fn api_error(message: String) -> CoreError {
        CoreError::Api {
            provider: "Stooq".into(),
            message,
        }
    }

    /// Parse Stooq's CSV payload: `Date,Open,High,Low,Close,Volume` rows,
    /// one header line, dates as `YYYY-MM-DD`. Malformed rows are skipped.
    fn parse_csv(body: &str) -> Vec<PricePoint> {
        body.lines()
            .skip(1)
            .filter_map(|line| {
                let mut fields = line.split(',');
                let date: NaiveDate = fields.next()?.trim().parse().ok()?;
                let close: f64 = fields.nth(3)?.trim().parse().ok()?;
                Some(PricePoint::new(timeutil::start_of_day(date), close))
            })
            .collect()
    }
}

impl Default for StooqProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for StooqProvider {
    fn name(&self) -> &str {
        "Stooq"
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<InstrumentProfile, CoreError> {
        // No metadata endpoint; report what the symbol itself tells us.
        let upper = symbol.trim().to_uppercase();
        if upper.is_empty() {
            return Err(Self::api_error("Empty symbol".into()));
        }
        let currency = if upper.ends_with(".US") { "USD" } else { "EUR" };
        Ok(InstrumentProfile {
            name: upper,
            currency: currency.to_string(),
            sector: "Unknown".to_string(),
        })
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let sym = symbol.trim().to_lowercase();
        let url = format!(
            "{BASE_URL}?s={sym}&d1={}&d2={}&i=d",
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        );

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(CoreError::from)?
            .text()
            .await?;

        let points = Self::parse_csv(&body);
        if points.is_empty() {
            return Err(Self::api_error(format!("No daily data for {symbol}")));
        }
        Ok(points)
    }

    async fn fetch_intraday_history(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        // Stooq has no intraday endpoint. An empty series is a valid answer:
        // price resolution falls back to the daily closes.
        Ok(Vec::new())
    }
}
