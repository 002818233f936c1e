//! Engine configuration, lifecycle state, latest-record snapshot, and run
//! result types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{BarRecord, CollectionId, DataRecord, ReplayMode, TickRecord, Timestamp};
use crate::window::TimeWindow;

/// Lifecycle of a replay engine.
///
/// `Configured → Loaded → Initialized → Running → Completed`, with `Failed`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Configured,
    Loaded,
    Initialized,
    Running,
    Completed,
    Failed,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Completed | EngineState::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Configured => "configured",
            EngineState::Loaded => "loaded",
            EngineState::Initialized => "initialized",
            EngineState::Running => "running",
            EngineState::Completed => "completed",
            EngineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Configuration for a single replay run. Every field must be set before
/// history can be loaded.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub mode: Option<ReplayMode>,
    pub window: Option<TimeWindow>,
    /// End date set before a start date; folded into the window once it exists.
    pub pending_end: Option<Timestamp>,
    pub collection: Option<CollectionId>,
}

/// Latest dispatched record and the simulated clock it drives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: Option<Timestamp>,
    pub bar: Option<BarRecord>,
    pub tick: Option<TickRecord>,
}

impl Snapshot {
    /// Move the clock to `record` and keep it as the latest bar or tick.
    pub fn advance(&mut self, record: &DataRecord) {
        self.time = Some(record.datetime());
        match record {
            DataRecord::Bar(bar) => self.bar = Some(bar.clone()),
            DataRecord::Tick(tick) => self.tick = Some(tick.clone()),
        }
    }
}

/// Outcome of `load_history_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// False when the store could not be reached and the engine is degraded.
    pub connected: bool,
    pub init_records: usize,
    /// Documents in the evaluation range, as reported by the store.
    pub evaluation_records: u64,
}

/// Result of a completed replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: EngineState,
    pub mode: ReplayMode,
    pub connected: bool,
    pub init_records: usize,
    pub dispatched: usize,
    pub final_time: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::day_start;
    use chrono::NaiveDate;

    #[test]
    fn terminal_states() {
        assert!(EngineState::Completed.is_terminal());
        assert!(EngineState::Failed.is_terminal());
        assert!(!EngineState::Running.is_terminal());
        assert!(!EngineState::Configured.is_terminal());
    }

    #[test]
    fn snapshot_tracks_latest_by_variant() {
        let ts = day_start(NaiveDate::from_ymd_opt(2010, 4, 27).unwrap());
        let mut snapshot = Snapshot::default();
        snapshot.advance(&DataRecord::Tick(TickRecord::trade("IF0000", ts, 3300.0, 1.0)));
        assert_eq!(snapshot.time, Some(ts));
        assert!(snapshot.tick.is_some());
        assert!(snapshot.bar.is_none());
    }
}
