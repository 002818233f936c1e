//! Replay runner: wires a config, a store and a strategy into one engine run.
//!
//! Two entry points:
//! - `run_replay()`: opens the store named by the config. Used by the CLI.
//! - `run_replay_with_store()`: takes an unconnected store handle. Used by
//!   sweeps and tests.
//!
//! Configuration problems come back as `Err`. A run that starts and then
//! fails (strategy error, bad record) still produces a report, with
//! `state == Failed` and the error message, so sweeps can keep going.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use replaylab_core::domain::{BarRecord, CollectionId, ReplayMode, TickRecord, Timestamp};
use replaylab_core::engine::{EngineError, EngineState, LoadReport, LogEntry, ReplayEngine};
use replaylab_core::store::HistoricalStore;
use replaylab_core::strategy::StrategyConfig;
use replaylab_core::window::TimeWindow;

use crate::config::{ConfigError, ReplayConfig, RunId};
use crate::stores::open_store;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything a finished (or failed) run leaves behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub store: String,
    pub collection: CollectionId,
    pub mode: ReplayMode,
    pub window: TimeWindow,
    pub strategy: StrategyConfig,
    pub state: EngineState,
    pub error: Option<String>,
    pub load: Option<LoadReport>,
    pub dispatched: usize,
    pub final_time: Option<Timestamp>,
    pub latest_bar: Option<BarRecord>,
    pub latest_tick: Option<TickRecord>,
    pub stats: BTreeMap<String, f64>,
    pub log: Vec<LogEntry>,
}

impl ReplayReport {
    pub fn is_success(&self) -> bool {
        self.state == EngineState::Completed
    }

    pub fn short_id(&self) -> &str {
        short_run_id(&self.run_id)
    }
}

/// Leading 12 characters of a run id, or the whole id if it is shorter.
pub fn short_run_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

/// Configure an engine from `config` on top of `store`.
pub fn build_engine(
    config: &ReplayConfig,
    store: Box<dyn HistoricalStore>,
) -> Result<ReplayEngine, RunError> {
    let replay = &config.replay;
    let mut engine = ReplayEngine::new(store);
    engine.set_mode(replay.mode)?;
    engine.set_start_date(&replay.start_date, replay.warmup_days)?;
    engine.set_end_date(&replay.end_date)?;
    engine.set_database(&replay.database, &replay.collection)?;
    engine.init_strategy(&config.strategy)?;
    Ok(engine)
}

/// Run one replay against the store named in `config`.
pub fn run_replay(config: &ReplayConfig) -> Result<ReplayReport, RunError> {
    let store = open_store(&config.store)?;
    run_replay_with_store(config, store)
}

/// Run one replay against an explicit store handle.
pub fn run_replay_with_store(
    config: &ReplayConfig,
    store: Box<dyn HistoricalStore>,
) -> Result<ReplayReport, RunError> {
    config.validate()?;
    let window = config.replay.window()?;
    let run_id = config.run_id();
    let mut engine = build_engine(config, store)?;

    let load = match engine.load_history_data() {
        Ok(load) => Some(load),
        Err(err) if engine.state() == EngineState::Configured => return Err(err.into()),
        Err(_) => None,
    };

    let error = if engine.state() == EngineState::Loaded {
        engine.run_backtesting().err().map(|e| e.to_string())
    } else {
        engine.log().last().map(|entry| entry.message.clone())
    };

    let short_id = short_run_id(&run_id);
    match &error {
        None => info!(run_id = short_id, dispatched = engine.dispatched(), "replay finished"),
        Some(message) => warn!(run_id = short_id, error = %message, "replay failed"),
    }

    Ok(ReplayReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        store: engine.store_name().to_string(),
        collection: config.replay.collection_id(),
        mode: config.replay.mode,
        window,
        strategy: config.strategy.clone(),
        state: engine.state(),
        error,
        load,
        dispatched: engine.dispatched(),
        final_time: engine.current_time(),
        latest_bar: engine.latest_bar().cloned(),
        latest_tick: engine.latest_tick().cloned(),
        stats: engine.strategy().map(|s| s.stats()).unwrap_or_default(),
        log: engine.log().entries().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReplaySettings, StoreSettings};
    use chrono::NaiveDate;
    use replaylab_core::domain::DataRecord;
    use replaylab_core::store::MemoryStore;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2010, 4, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(d: u32, close: f64) -> DataRecord {
        DataRecord::Bar(BarRecord {
            symbol: "IF0000".into(),
            exchange: String::new(),
            datetime: day(d),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            open_interest: 0.0,
        })
    }

    fn config(strategy: StrategyConfig) -> ReplayConfig {
        ReplayConfig {
            store: StoreSettings::default(),
            replay: ReplaySettings {
                mode: ReplayMode::Bar,
                start_date: "20100416".into(),
                warmup_days: 10,
                end_date: String::new(),
                database: "VnTrader_1Min_Db".into(),
                collection: "IF0000".into(),
            },
            strategy,
            sweep: BTreeMap::new(),
        }
    }

    fn store() -> Box<dyn HistoricalStore> {
        let coll = CollectionId::new("VnTrader_1Min_Db", "IF0000");
        Box::new(MemoryStore::new().with_records(
            &coll,
            [18, 20, 22, 24, 26, 27, 28, 29, 30]
                .into_iter()
                .map(|d| bar(d, d as f64)),
        ))
    }

    fn ema_config() -> ReplayConfig {
        config(
            StrategyConfig::new("double_ema")
                .with_param("fast_window", 2.0)
                .with_param("slow_window", 3.0),
        )
    }

    #[test]
    fn completed_report() {
        let report = run_replay_with_store(&ema_config(), store()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.store, "memory");
        assert_eq!(report.dispatched, 5);
        assert_eq!(report.final_time, Some(day(30)));
        assert_eq!(report.latest_bar.as_ref().unwrap().close, 30.0);
        assert_eq!(report.load.as_ref().unwrap().init_records, 4);
        assert_eq!(report.stats["bars_seen"], 5.0);
        assert!(!report.log.is_empty());
        assert_eq!(report.run_id, ema_config().run_id());
    }

    #[test]
    fn unknown_strategy_is_error() {
        let err = run_replay_with_store(&config(StrategyConfig::new("nope")), store()).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::Configuration(_))));
    }

    #[test]
    fn degraded_store_still_reports() {
        let report =
            run_replay_with_store(&ema_config(), Box::new(MemoryStore::unreachable())).unwrap();
        assert!(report.is_success());
        assert!(!report.load.as_ref().unwrap().connected);
        assert_eq!(report.dispatched, 0);
    }

    #[test]
    fn report_serializes() {
        let report = run_replay_with_store(&ema_config(), store()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: ReplayReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dispatched, report.dispatched);
        assert_eq!(back.log, report.log);
    }

    #[test]
    fn short_id_tolerates_short_ids() {
        assert_eq!(short_run_id(""), "");
        assert_eq!(short_run_id("abc"), "abc");
        assert_eq!(short_run_id("0123456789abcdef"), "0123456789ab");

        let mut report = run_replay_with_store(&ema_config(), store()).unwrap();
        assert_eq!(report.short_id().len(), 12);
        report.run_id = "hand-edited".into();
        assert_eq!(report.short_id(), "hand-edited");
    }
}
