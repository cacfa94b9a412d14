use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single price data point (UTC timestamp → closing price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// UTC calendar date of this point.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A time-ordered series of price points.
///
/// Both the daily closes and the hourly intraday quotes of an instrument are
/// stored in one of these. Points are kept sorted ascending by timestamp and
/// deduplicated by timestamp, so lookups can use binary search (O(log n)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from raw provider data: sorts, deduplicates by
    /// timestamp and drops non-finite or negative prices.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.price.is_finite() && p.price >= 0.0);
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        Self { points }
    }

    /// Replace the entire contents with freshly fetched data.
    pub fn replace(&mut self, points: Vec<PricePoint>) {
        *self = Self::from_points(points);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Most recent point, if any.
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Oldest point, if any.
    pub fn earliest(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    /// The trailing `n` points (fewer if less history exists).
    pub fn tail(&self, n: usize) -> &[PricePoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Insert or update a single point, keeping the series sorted.
    pub fn upsert(&mut self, point: PricePoint) {
        match self
            .points
            .binary_search_by_key(&point.timestamp, |p| p.timestamp)
        {
            Ok(idx) => self.points[idx] = point,
            Err(idx) => self.points.insert(idx, point),
        }
    }

    /// All points falling on a UTC calendar date, in timestamp order.
    pub fn points_on(&self, date: NaiveDate) -> &[PricePoint] {
        let start = self.points.partition_point(|p| p.date() < date);
        let end = self.points.partition_point(|p| p.date() <= date);
        &self.points[start..end]
    }

    /// First point on an exact UTC calendar date, if any.
    pub fn on_date(&self, date: NaiveDate) -> Option<&PricePoint> {
        self.points_on(date).first()
    }

    /// Latest point whose UTC date is at or before `date`.
    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<&PricePoint> {
        let end = self.points.partition_point(|p| p.date() <= date);
        if end == 0 {
            None
        } else {
            Some(&self.points[end - 1])
        }
    }
}
