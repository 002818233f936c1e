//! Bar record: an OHLCV observation aggregated over a fixed interval.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol over one interval.
///
/// `datetime` marks the start of the interval. Field names follow the
/// document layout used by the recorded collections (`openInterest`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarRecord {
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub open_interest: f64,
}

impl BarRecord {
    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }

    /// Calendar date of the interval start, `YYYYMMDD`.
    pub fn date_key(&self) -> String {
        self.datetime.format("%Y%m%d").to_string()
    }

    /// Wall-clock time of the interval start, `HH:MM:SS`.
    pub fn time_key(&self) -> String {
        self.datetime.format("%H:%M:%S").to_string()
    }
}
