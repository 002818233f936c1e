//! Run log: append-only diagnostic trail keyed to the simulated clock.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Timestamp;

/// One `(simulated time, message)` entry. `time` is `None` until the first
/// record has been dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: Option<Timestamp>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "{} {}", time, self.message),
            None => write!(f, "None {}", self.message),
        }
    }
}

/// Ordered log entries for a single engine run. Never truncated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: Option<Timestamp>, message: impl Into<String>) {
        self.entries.push(LogEntry {
            time,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Rendered `"{time} {message}"` lines.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    /// Latest simulated time that appears in the log.
    pub fn latest_time(&self) -> Option<Timestamp> {
        self.entries.iter().filter_map(|e| e.time).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn entries_keep_append_order() {
        let mut log = RunLog::new();
        log.push(None, "first");
        log.push(None, "second");
        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn display_prefixes_simulated_time() {
        let ts = NaiveDate::from_ymd_opt(2010, 4, 27)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let mut log = RunLog::new();
        log.push(None, "loading");
        log.push(Some(ts), "golden cross");
        assert_eq!(log.lines(), vec!["None loading", "2010-04-27 09:15:00 golden cross"]);
        assert_eq!(log.latest_time(), Some(ts));
    }
}
