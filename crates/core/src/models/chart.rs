use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single point in a chartable (date, value) series — a daily close in a
/// price history or a position value in a performance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}
