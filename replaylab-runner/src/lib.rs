//! ReplayLab Runner: replay orchestration on top of `replaylab-core`.
//!
//! This crate provides:
//! - TOML run configuration and content-addressed run ids
//! - MongoDB and JSON-lines history stores
//! - Single replay runs producing a serializable report
//! - Parameter sweeps (rayon)
//! - Bar CSV import and seeded synthetic history

pub mod config;
pub mod export;
pub mod import;
pub mod jsonl;
pub mod mongo;
pub mod runner;
pub mod stores;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, ReplayConfig, ReplaySettings, RunId, StoreKind, StoreSettings};
pub use export::{export_json, export_log_csv, import_json, load_artifacts, save_artifacts};
pub use import::{import_into, read_bars, read_bars_file, ImportError};
pub use jsonl::JsonlStore;
pub use mongo::MongoStore;
pub use runner::{
    build_engine, run_replay, run_replay_with_store, short_run_id, ReplayReport, RunError,
    SCHEMA_VERSION,
};
pub use stores::open_store;
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
pub use synthetic::{generate, generate_bars, generate_ticks, Interval, SyntheticParams};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<ReplayReport>();
        assert_sync::<ReplayReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ReplayConfig>();
        assert_sync::<ReplayConfig>();
        assert_send::<SyntheticParams>();
        assert_sync::<SyntheticParams>();
    }

    #[test]
    fn stores_are_send() {
        assert_send::<JsonlStore>();
        assert_send::<MongoStore>();
    }

    #[test]
    fn run_error_is_send() {
        assert_send::<RunError>();
    }
}
