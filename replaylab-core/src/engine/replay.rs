//! The replay engine.

use tracing::{debug, error, info, warn};

use crate::domain::{BarRecord, CollectionId, DataRecord, ReplayMode, TickRecord, Timestamp};
use crate::store::{empty_cursor, HistoricalStore, RecordCursor, StoreError};
use crate::strategy::{create_strategy, Hook, Strategy, StrategyConfig, StrategyContext, StrategyError};
use crate::window::{parse_end_date, TimeWindow};

use super::access::{self, LookupError};
use super::log::RunLog;
use super::state::{EngineConfig, EngineState, LoadReport, RunSummary, Snapshot};
use super::EngineError;

type Deliver = fn(&mut dyn Strategy, &DataRecord, &mut StrategyContext<'_>) -> Result<(), StrategyError>;

fn deliver_bar(
    strategy: &mut dyn Strategy,
    record: &DataRecord,
    ctx: &mut StrategyContext<'_>,
) -> Result<(), StrategyError> {
    match record {
        DataRecord::Bar(bar) => strategy.on_bar(bar, ctx),
        DataRecord::Tick(tick) => Err(StrategyError::failed(format!(
            "tick at {} delivered to a bar-mode run",
            tick.datetime
        ))),
    }
}

fn deliver_tick(
    strategy: &mut dyn Strategy,
    record: &DataRecord,
    ctx: &mut StrategyContext<'_>,
) -> Result<(), StrategyError> {
    match record {
        DataRecord::Tick(tick) => strategy.on_tick(tick, ctx),
        DataRecord::Bar(bar) => Err(StrategyError::failed(format!(
            "bar at {} delivered to a tick-mode run",
            bar.datetime
        ))),
    }
}

/// Mode-specific dispatch, resolved once when history is loaded.
#[derive(Clone, Copy)]
struct DispatchPath {
    mode: ReplayMode,
    hook: Hook,
    deliver: Deliver,
}

impl DispatchPath {
    fn for_mode(mode: ReplayMode) -> Self {
        match mode {
            ReplayMode::Bar => Self {
                mode,
                hook: Hook::Bar,
                deliver: deliver_bar,
            },
            ReplayMode::Tick => Self {
                mode,
                hook: Hook::Tick,
                deliver: deliver_tick,
            },
        }
    }
}

/// Replays one collection through one strategy.
///
/// The engine owns its store handle, strategy, init segment, cursor and log.
/// Nothing is shared between engines, so independent runs can be executed on
/// separate threads.
pub struct ReplayEngine {
    store: Box<dyn HistoricalStore>,
    config: EngineConfig,
    state: EngineState,
    strategy: Option<Box<dyn Strategy>>,
    path: Option<DispatchPath>,
    init_data: Vec<DataRecord>,
    cursor: Option<RecordCursor>,
    snapshot: Snapshot,
    log: RunLog,
    dispatched: usize,
    inited: bool,
    trading: bool,
}

impl ReplayEngine {
    pub fn new(store: Box<dyn HistoricalStore>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            state: EngineState::Configured,
            strategy: None,
            path: None,
            init_data: Vec::new(),
            cursor: None,
            snapshot: Snapshot::default(),
            log: RunLog::new(),
            dispatched: 0,
            inited: false,
            trading: false,
        }
    }

    // ── Configuration ──

    pub fn set_mode(&mut self, mode: ReplayMode) -> Result<(), EngineError> {
        self.ensure_state(EngineState::Configured, "set_mode")?;
        self.config.mode = Some(mode);
        Ok(())
    }

    /// Set the data start date and warm-up length; the strategy start is
    /// `date + warmup_days`. Any end date already set is kept.
    pub fn set_start_date(&mut self, date: &str, warmup_days: i64) -> Result<(), EngineError> {
        self.ensure_state(EngineState::Configured, "set_start_date")?;
        match self.config.window.as_mut() {
            Some(window) => window.set_start(date, warmup_days)?,
            None => {
                let window =
                    TimeWindow::from_start(date, warmup_days)?.with_end(self.config.pending_end.take());
                self.config.window = Some(window);
            }
        }
        Ok(())
    }

    /// Set the inclusive end date; an empty string removes the bound.
    pub fn set_end_date(&mut self, date: &str) -> Result<(), EngineError> {
        self.ensure_state(EngineState::Configured, "set_end_date")?;
        let end = parse_end_date(date)?;
        match self.config.window.take() {
            Some(window) => self.config.window = Some(window.with_end(end)),
            None => self.config.pending_end = end,
        }
        Ok(())
    }

    pub fn set_database(
        &mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.ensure_state(EngineState::Configured, "set_database")?;
        self.config.collection = Some(CollectionId::new(database, collection));
        Ok(())
    }

    pub fn attach_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<(), EngineError> {
        self.ensure_state(EngineState::Configured, "attach_strategy")?;
        self.strategy = Some(strategy);
        Ok(())
    }

    /// Build a strategy through the factory and attach it.
    pub fn init_strategy(&mut self, config: &StrategyConfig) -> Result<(), EngineError> {
        let strategy =
            create_strategy(config).map_err(|e| EngineError::Configuration(e.to_string()))?;
        self.attach_strategy(strategy)
    }

    // ── Lifecycle ──

    /// Connect, materialize the init segment and open the evaluation cursor.
    ///
    /// An unreachable store is not an error: the engine logs it, loads two
    /// empty segments and reports `connected: false`.
    pub fn load_history_data(&mut self) -> Result<LoadReport, EngineError> {
        self.ensure_state(EngineState::Configured, "load_history_data")?;
        let (mode, window, collection) = self.resolved_config()?;
        let path = DispatchPath::for_mode(mode);

        self.write_log("start loading history data");
        let connected = match self.store.connect() {
            Ok(()) => true,
            Err(StoreError::Config(reason)) => return Err(EngineError::StoreConfig(reason)),
            Err(err) => {
                warn!(store = self.store.name(), error = %err, "store unreachable, running without data");
                self.write_log(format!("store unavailable, no history loaded: {err}"));
                false
            }
        };

        let mut report = LoadReport {
            connected,
            init_records: 0,
            evaluation_records: 0,
        };

        if connected {
            let init = match self.load_init_segment(&collection, &window, mode) {
                Ok(init) => init,
                Err(err) => return Err(self.fail(err)),
            };
            report.init_records = init.len();
            self.init_data = init;
            self.write_log(format!("init data loaded: {} records", report.init_records));

            let evaluation = self
                .store
                .count(&collection, &window.evaluation_range())
                .and_then(|count| {
                    let cursor = self.store.query(&collection, &window.evaluation_range(), mode)?;
                    Ok((count, cursor))
                });
            match evaluation {
                Ok((count, cursor)) => {
                    report.evaluation_records = count;
                    self.cursor = Some(cursor);
                }
                Err(err) => return Err(self.fail(EngineError::StoreQuery(err))),
            }
            self.write_log(format!(
                "backtesting data loaded: {} records",
                report.evaluation_records
            ));
        } else {
            self.init_data.clear();
            self.cursor = Some(empty_cursor());
        }

        self.path = Some(path);
        self.state = EngineState::Loaded;
        info!(
            %collection,
            %mode,
            connected,
            init = report.init_records,
            evaluation = report.evaluation_records,
            "history loaded"
        );
        Ok(report)
    }

    /// Run initialization, start, and the dispatch loop to completion.
    ///
    /// Loads history first when called on a `Configured` engine. Any strategy
    /// or store error stops the loop and leaves the engine `Failed`, with the
    /// log intact up to the failing record.
    pub fn run_backtesting(&mut self) -> Result<RunSummary, EngineError> {
        match self.state {
            EngineState::Configured => {
                self.load_history_data()?;
            }
            EngineState::Loaded => {}
            state => {
                return Err(EngineError::InvalidState {
                    operation: "run_backtesting",
                    state,
                })
            }
        }
        let path = self.path.ok_or_else(|| {
            EngineError::Configuration("dispatch path not resolved".to_string())
        })?;

        self.inited = true;
        self.write_log("strategy init started");
        self.call_hook(Hook::Init, |s, ctx| s.on_init(ctx))?;
        self.write_log("strategy init finished");
        self.state = EngineState::Initialized;

        self.trading = true;
        self.call_hook(Hook::Start, |s, ctx| s.on_start(ctx))?;
        self.write_log("strategy started, replaying history");
        self.state = EngineState::Running;
        info!(mode = %path.mode, "replay started");

        let cursor = self.cursor.take().unwrap_or_else(empty_cursor);
        for item in cursor {
            let record = match item {
                Ok(record) => record,
                Err(err) => return Err(self.fail(EngineError::StoreQuery(err))),
            };
            if let Err(err) = self.check_next(&record, path.mode) {
                return Err(self.fail(err));
            }
            self.snapshot.advance(&record);
            self.dispatched += 1;
            self.call_hook(path.hook, |s, ctx| (path.deliver)(s, &record, ctx))?;
        }

        self.state = EngineState::Completed;
        self.write_log("replay finished");
        info!(dispatched = self.dispatched, "replay completed");
        Ok(self.summary(path.mode))
    }

    // ── Data access ──

    /// The materialized initialization segment, ascending by timestamp.
    pub fn fetch_init_segment(&self) -> &[DataRecord] {
        &self.init_data
    }

    /// Fresh cursor over `[reference_date - lookback_days, reference_date]` of
    /// the configured collection. Empty when the store is not connected.
    pub fn fetch_recent_window(
        &self,
        reference_date: &str,
        lookback_days: i64,
    ) -> Result<RecordCursor, EngineError> {
        let (Some(mode), Some(collection)) = (self.config.mode, self.config.collection.as_ref())
        else {
            return Err(EngineError::Configuration(
                "mode and collection must be set before querying".to_string(),
            ));
        };
        access::recent_window(self.store.as_ref(), collection, mode, reference_date, lookback_days)
            .map_err(|err| match err {
                LookupError::Window(e) => EngineError::InvalidDate(e),
                LookupError::Store(e) => EngineError::StoreQuery(e),
            })
    }

    /// Append `record` to `collection`. Returns `Ok(false)` without writing
    /// when the store is not connected.
    pub fn persist(
        &mut self,
        collection: &CollectionId,
        record: &DataRecord,
    ) -> Result<bool, EngineError> {
        access::persist(self.store.as_mut(), collection, record).map_err(EngineError::Persist)
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    // ── Accessors ──

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Simulated current time: timestamp of the last dispatched record.
    pub fn current_time(&self) -> Option<Timestamp> {
        self.snapshot.time
    }

    pub fn latest_bar(&self) -> Option<&BarRecord> {
        self.snapshot.bar.as_ref()
    }

    pub fn latest_tick(&self) -> Option<&TickRecord> {
        self.snapshot.tick.as_ref()
    }

    pub fn strategy(&self) -> Option<&dyn Strategy> {
        self.strategy.as_deref()
    }

    /// Number of records handed to `on_bar`/`on_tick`, including a failing one.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    // ── Internals ──

    fn ensure_state(&self, expected: EngineState, operation: &'static str) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn resolved_config(&self) -> Result<(ReplayMode, TimeWindow, CollectionId), EngineError> {
        let mode = self
            .config
            .mode
            .ok_or_else(|| EngineError::Configuration("replay mode not set".to_string()))?;
        let window = self
            .config
            .window
            .ok_or_else(|| EngineError::Configuration("start date not set".to_string()))?;
        let collection = self
            .config
            .collection
            .clone()
            .filter(CollectionId::is_set)
            .ok_or_else(|| EngineError::Configuration("database and collection not set".to_string()))?;
        if self.strategy.is_none() {
            return Err(EngineError::Configuration("no strategy attached".to_string()));
        }
        Ok((mode, window, collection))
    }

    fn load_init_segment(
        &self,
        collection: &CollectionId,
        window: &TimeWindow,
        mode: ReplayMode,
    ) -> Result<Vec<DataRecord>, EngineError> {
        let records = self
            .store
            .query(collection, &window.init_range(), mode)
            .and_then(|cursor| cursor.collect::<Result<Vec<_>, _>>())
            .map_err(EngineError::StoreQuery)?;
        let ordered = records
            .windows(2)
            .all(|pair| pair[0].datetime() <= pair[1].datetime());
        if !ordered {
            return Err(EngineError::StoreQuery(StoreError::query(
                collection,
                "init segment not sorted by datetime",
            )));
        }
        Ok(records)
    }

    /// Reject a record of the wrong variant or one that moves the clock back.
    fn check_next(&self, record: &DataRecord, mode: ReplayMode) -> Result<(), EngineError> {
        let collection = || self.config.collection.clone().unwrap_or_default();
        if record.mode() != mode {
            return Err(EngineError::StoreQuery(StoreError::schema(
                &collection(),
                "kind",
                format!("expected a {mode} record, found {}", record.mode()),
            )));
        }
        if let Some(prev) = self.snapshot.time {
            if record.datetime() < prev {
                return Err(EngineError::StoreQuery(StoreError::query(
                    &collection(),
                    format!("record at {} arrived after {prev}", record.datetime()),
                )));
            }
        }
        Ok(())
    }

    /// Invoke one strategy hook with a fresh context. On error the engine is
    /// moved to `Failed` before the error is returned.
    fn call_hook(
        &mut self,
        hook: Hook,
        f: impl FnOnce(&mut dyn Strategy, &mut StrategyContext<'_>) -> Result<(), StrategyError>,
    ) -> Result<(), EngineError> {
        let (Some(strategy), Some(mode), Some(window), Some(source)) = (
            self.strategy.as_deref_mut(),
            self.config.mode,
            self.config.window.as_ref(),
            self.config.collection.as_ref(),
        ) else {
            return Err(EngineError::Configuration(format!(
                "{hook} called on an incomplete configuration"
            )));
        };

        let mut ctx = StrategyContext {
            mode,
            source,
            window,
            snapshot: &self.snapshot,
            init_data: &self.init_data,
            log: &mut self.log,
            store: self.store.as_mut(),
            inited: self.inited,
            trading: self.trading,
        };
        let result = f(&mut *strategy, &mut ctx);

        match result {
            Ok(()) => Ok(()),
            Err(source) => {
                let name = strategy.name().to_string();
                debug!(strategy = %name, %hook, "hook returned error");
                Err(self.fail(EngineError::StrategyCallback {
                    strategy: name,
                    hook,
                    source,
                }))
            }
        }
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        self.state = EngineState::Failed;
        self.cursor = None;
        self.write_log(format!("run failed: {err}"));
        error!(error = %err, dispatched = self.dispatched, "replay failed");
        err
    }

    fn write_log(&mut self, message: impl Into<String>) {
        self.log.push(self.snapshot.time, message);
    }

    fn summary(&self, mode: ReplayMode) -> RunSummary {
        RunSummary {
            state: self.state,
            mode,
            connected: self.store.is_connected(),
            init_records: self.init_data.len(),
            dispatched: self.dispatched,
            final_time: self.snapshot.time,
        }
    }
}
