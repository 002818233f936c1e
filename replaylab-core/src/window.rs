//! Time window: partitions calendar time into the initialization segment and
//! the evaluation segment.
//!
//! ```text
//!   data_start            strategy_start                 data_end
//!       |---- init segment ----)|------ evaluation segment ------]
//! ```
//!
//! The init segment is half-open. The evaluation segment is closed, or open
//! above when no end date is set. An end date that precedes the strategy start
//! yields an empty evaluation segment; that is a valid window, not an error.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid date '{0}' (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("warm-up must be non-negative, got {0} days")]
    NegativeWarmup(i64),

    #[error("date arithmetic out of range: {0} + {1} days")]
    OutOfRange(NaiveDate, i64),
}

/// Parse a calendar date in either `YYYYMMDD` or `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Result<NaiveDate, WindowError> {
    let s = input.trim();
    let invalid = || WindowError::InvalidDate(input.to_string());

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[0..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
        let day: u32 = s[6..8].parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())
}

/// Midnight at the start of `date`.
pub fn day_start(date: NaiveDate) -> Timestamp {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Upper edge of a [`TimeRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpperBound {
    /// `timestamp < t`
    Exclusive(Timestamp),
    /// `timestamp <= t`
    Inclusive(Timestamp),
    Unbounded,
}

/// Timestamp filter with an inclusive lower edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: UpperBound,
}

impl TimeRange {
    /// `[start, end)`
    pub fn half_open(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end: UpperBound::Exclusive(end),
        }
    }

    /// `[start, end]`
    pub fn closed(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end: UpperBound::Inclusive(end),
        }
    }

    /// `[start, +inf)`
    pub fn open_ended(start: Timestamp) -> Self {
        Self {
            start,
            end: UpperBound::Unbounded,
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        if ts < self.start {
            return false;
        }
        match self.end {
            UpperBound::Exclusive(end) => ts < end,
            UpperBound::Inclusive(end) => ts <= end,
            UpperBound::Unbounded => true,
        }
    }

    /// True when no timestamp can satisfy the range.
    pub fn is_empty(&self) -> bool {
        match self.end {
            UpperBound::Exclusive(end) => end <= self.start,
            UpperBound::Inclusive(end) => end < self.start,
            UpperBound::Unbounded => false,
        }
    }
}

/// Init/evaluation partition derived from a start date, warm-up length, and
/// optional end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    data_start: Timestamp,
    strategy_start: Timestamp,
    data_end: Option<Timestamp>,
    warmup_days: i64,
}

impl TimeWindow {
    /// Build a window from a parsed start date and warm-up length, unbounded above.
    pub fn new(start: NaiveDate, warmup_days: i64) -> Result<Self, WindowError> {
        if warmup_days < 0 {
            return Err(WindowError::NegativeWarmup(warmup_days));
        }
        let strategy_date = start
            .checked_add_signed(Duration::days(warmup_days))
            .ok_or(WindowError::OutOfRange(start, warmup_days))?;
        Ok(Self {
            data_start: day_start(start),
            strategy_start: day_start(strategy_date),
            data_end: None,
            warmup_days,
        })
    }

    /// Parse `date` and build a window with `warmup_days` of initialization data.
    pub fn from_start(date: &str, warmup_days: i64) -> Result<Self, WindowError> {
        Self::new(parse_date(date)?, warmup_days)
    }

    /// Reset the start date and warm-up length, keeping any end date.
    pub fn set_start(&mut self, date: &str, warmup_days: i64) -> Result<(), WindowError> {
        let end = self.data_end;
        *self = Self::from_start(date, warmup_days)?;
        self.data_end = end;
        Ok(())
    }

    /// Set the inclusive end date. An empty string clears it (unbounded).
    pub fn set_end(&mut self, date: &str) -> Result<(), WindowError> {
        self.data_end = parse_end_date(date)?;
        Ok(())
    }

    pub fn with_end(mut self, end: Option<Timestamp>) -> Self {
        self.data_end = end;
        self
    }

    pub fn data_start(&self) -> Timestamp {
        self.data_start
    }

    pub fn strategy_start(&self) -> Timestamp {
        self.strategy_start
    }

    pub fn data_end(&self) -> Option<Timestamp> {
        self.data_end
    }

    pub fn warmup_days(&self) -> i64 {
        self.warmup_days
    }

    /// `[data_start, strategy_start)`
    pub fn init_range(&self) -> TimeRange {
        TimeRange::half_open(self.data_start, self.strategy_start)
    }

    /// `[strategy_start, data_end]`, or `[strategy_start, +inf)` without an end date.
    pub fn evaluation_range(&self) -> TimeRange {
        match self.data_end {
            Some(end) => TimeRange::closed(self.strategy_start, end),
            None => TimeRange::open_ended(self.strategy_start),
        }
    }

    /// End date precedes the strategy start: nothing will be dispatched.
    pub fn is_degenerate(&self) -> bool {
        self.evaluation_range().is_empty()
    }
}

/// Parse an optional end date; blank input means unbounded.
pub fn parse_end_date(date: &str) -> Result<Option<Timestamp>, WindowError> {
    if date.trim().is_empty() {
        return Ok(None);
    }
    parse_date(date).map(|d| Some(day_start(d)))
}

/// `[reference - lookback_days, reference]` for trailing-window lookups.
pub fn lookback_range(reference: NaiveDate, lookback_days: i64) -> Result<TimeRange, WindowError> {
    if lookback_days < 0 {
        return Err(WindowError::NegativeWarmup(lookback_days));
    }
    let start = reference
        .checked_sub_signed(Duration::days(lookback_days))
        .ok_or(WindowError::OutOfRange(reference, -lookback_days))?;
    Ok(TimeRange::closed(day_start(start), day_start(reference)))
}
