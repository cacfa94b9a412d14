use async_trait::async_trait;
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentProfile;
use crate::models::price::PricePoint;
use crate::timeutil;

use super::traits::MarketDataProvider;

/// Yahoo Finance provider — the primary market-data source.
///
/// - **Free**: no API key required (unofficial public API).
/// - **Coverage**: global equities, ETFs, indices, mutual funds.
/// - **Data**: quote metadata, daily OHLCV history, hourly intraday quotes.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's public
/// chart and search endpoints.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    fn api_error(message: String) -> CoreError {
        CoreError::Api {
            provider: "Yahoo Finance".into(),
            message,
        }
    }

    /// Convert a UTC instant to the `time` crate's `OffsetDateTime`.
    fn to_offset_datetime(at: DateTime<Utc>) -> Result<OffsetDateTime, CoreError> {
        OffsetDateTime::from_unix_timestamp(at.timestamp())
            .map_err(|e| Self::api_error(format!("Invalid timestamp {at}: {e}")))
    }

    /// Map raw quotes into normalized UTC price points within the range.
    fn quotes_to_points(
        quotes: &[yahoo_finance_api::Quote],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<PricePoint> {
        quotes
            .iter()
            .filter_map(|q| {
                let timestamp = timeutil::from_unix(q.timestamp)?;
                if timestamp >= start && timestamp <= end {
                    Some(PricePoint::new(timestamp, q.close))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<InstrumentProfile, CoreError> {
        // Display name and classification come from the search endpoint; the
        // quote currency from the chart metadata.
        let search = self
            .connector
            .search_ticker(symbol)
            .await
            .map_err(|e| Self::api_error(format!("Search failed for {symbol}: {e}")))?;

        let upper = symbol.to_uppercase();
        let item = search
            .quotes
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .or_else(|| search.quotes.first())
            .ok_or_else(|| Self::api_error(format!("Unknown symbol: {symbol}")))?;

        let name = if !item.long_name.is_empty() {
            item.long_name.clone()
        } else if !item.short_name.is_empty() {
            item.short_name.clone()
        } else {
            upper.clone()
        };
        let sector = if item.type_display.is_empty() {
            "Unknown".to_string()
        } else {
            item.type_display.clone()
        };

        let quotes = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| Self::api_error(format!("Failed to fetch quote for {symbol}: {e}")))?;
        let currency = quotes
            .metadata()
            .ok()
            .and_then(|m| m.currency)
            .unwrap_or_else(|| "EUR".to_string());

        Ok(InstrumentProfile {
            name,
            currency,
            sector,
        })
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let resp = self
            .connector
            .get_quote_history(
                symbol,
                Self::to_offset_datetime(start)?,
                Self::to_offset_datetime(end)?,
            )
            .await
            .map_err(|e| Self::api_error(format!("Failed to fetch history for {symbol}: {e}")))?;

        let quotes = resp
            .quotes()
            .map_err(|e| Self::api_error(format!("Failed to parse quotes for {symbol}: {e}")))?;

        Ok(Self::quotes_to_points(&quotes, start, end))
    }

    async fn fetch_intraday_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let resp = self
            .connector
            .get_quote_history_interval(
                symbol,
                Self::to_offset_datetime(start)?,
                Self::to_offset_datetime(end)?,
                "1h",
            )
            .await
            .map_err(|e| {
                Self::api_error(format!("Failed to fetch intraday data for {symbol}: {e}"))
            })?;

        let quotes = resp
            .quotes()
            .map_err(|e| Self::api_error(format!("Failed to parse quotes for {symbol}: {e}")))?;

        Ok(Self::quotes_to_points(&quotes, start, end))
    }
}
