//! Replay engine: windowed history loading and ordered dispatch to a strategy.
//!
//! A run moves through `Configured → Loaded → Initialized → Running →
//! Completed`. Loading materializes the initialization segment and opens a
//! lazy cursor over the evaluation segment; running calls `on_init` and
//! `on_start` once each and then feeds evaluation records one at a time to
//! `on_bar` or `on_tick`.

pub mod access;
pub mod log;
pub mod replay;
pub mod state;

pub use access::LookupError;
pub use log::{LogEntry, RunLog};
pub use replay::ReplayEngine;
pub use state::{EngineConfig, EngineState, LoadReport, RunSummary, Snapshot};

use thiserror::Error;

use crate::store::StoreError;
use crate::strategy::{Hook, StrategyError};
use crate::window::WindowError;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid run configuration. The engine stays `Configured`.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid date: {0}")]
    InvalidDate(#[from] WindowError),

    /// Connection parameters rejected by the store. The engine stays `Configured`.
    #[error("store configuration error: {0}")]
    StoreConfig(String),

    #[error("store query failed: {0}")]
    StoreQuery(StoreError),

    #[error("persist failed: {0}")]
    Persist(StoreError),

    #[error("strategy {strategy} failed in {hook}: {source}")]
    StrategyCallback {
        strategy: String,
        hook: Hook,
        #[source]
        source: StrategyError,
    },

    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
}
