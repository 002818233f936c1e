//! Per-hook view of engine state handed to a strategy.

use crate::domain::{BarRecord, CollectionId, DataRecord, ReplayMode, TickRecord, Timestamp};
use crate::engine::access;
use crate::engine::log::RunLog;
use crate::engine::state::Snapshot;
use crate::store::{HistoricalStore, RecordCursor};
use crate::window::TimeWindow;

use super::StrategyError;

/// Borrowed view of a running engine.
///
/// Snapshots are read-only. The only ways to change engine-owned state are
/// [`write_log`](Self::write_log) and [`persist`](Self::persist).
pub struct StrategyContext<'a> {
    pub(crate) mode: ReplayMode,
    pub(crate) source: &'a CollectionId,
    pub(crate) window: &'a TimeWindow,
    pub(crate) snapshot: &'a Snapshot,
    pub(crate) init_data: &'a [DataRecord],
    pub(crate) log: &'a mut RunLog,
    pub(crate) store: &'a mut dyn HistoricalStore,
    pub(crate) inited: bool,
    pub(crate) trading: bool,
}

impl<'a> StrategyContext<'a> {
    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    /// Collection the run replays.
    pub fn source(&self) -> &CollectionId {
        self.source
    }

    pub fn window(&self) -> &TimeWindow {
        self.window
    }

    /// Simulated current time: timestamp of the latest dispatched record.
    pub fn current_time(&self) -> Option<Timestamp> {
        self.snapshot.time
    }

    pub fn latest_bar(&self) -> Option<&BarRecord> {
        self.snapshot.bar.as_ref()
    }

    pub fn latest_tick(&self) -> Option<&TickRecord> {
        self.snapshot.tick.as_ref()
    }

    /// Materialized initialization segment, ascending by timestamp.
    pub fn init_data(&self) -> &[DataRecord] {
        self.init_data
    }

    /// Initialization has been signalled (set before `on_init` runs).
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    /// Trading has been signalled (set before `on_start` runs).
    pub fn is_trading(&self) -> bool {
        self.trading
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Append a run log entry stamped with the simulated clock.
    pub fn write_log(&mut self, message: impl Into<String>) {
        self.log.push(self.snapshot.time, message);
    }

    /// Write a record back to the store. A no-op without a connection.
    pub fn persist(
        &mut self,
        collection: &CollectionId,
        record: &DataRecord,
    ) -> Result<(), StrategyError> {
        access::persist(&mut *self.store, collection, record)?;
        Ok(())
    }

    /// Fresh cursor over `[reference_date - lookback_days, reference_date]`
    /// of the replayed collection.
    pub fn fetch_recent_window(
        &self,
        reference_date: &str,
        lookback_days: i64,
    ) -> Result<RecordCursor, StrategyError> {
        Ok(access::recent_window(
            &*self.store,
            self.source,
            self.mode,
            reference_date,
            lookback_days,
        )?)
    }
}
