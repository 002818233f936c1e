//! Strategy callback interface.
//!
//! The same `Strategy` implementation runs live and under replay: the engine
//! calls `on_init` and `on_start` once each, then `on_bar` or `on_tick` once
//! per evaluation record, depending on the replay mode. Every hook receives a
//! [`StrategyContext`] giving read-only access to the engine's latest
//! snapshot and explicit mutators for logging and persistence.

pub mod bar_builder;
pub mod context;
pub mod double_ema;
pub mod factory;

pub use bar_builder::BarBuilder;
pub use context::StrategyContext;
pub use double_ema::DoubleEma;
pub use factory::{create_strategy, FactoryError, StrategyConfig};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarRecord, TickRecord};
use crate::engine::access::LookupError;
use crate::store::StoreError;

/// Errors raised from inside a strategy hook.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{0}")]
    Failed(String),

    #[error("store access failed: {0}")]
    Store(#[from] StoreError),

    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl StrategyError {
    pub fn failed(message: impl Into<String>) -> Self {
        StrategyError::Failed(message.into())
    }
}

/// Which hook was executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hook {
    Init,
    Start,
    Bar,
    Tick,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Hook::Init => "on_init",
            Hook::Start => "on_start",
            Hook::Bar => "on_bar",
            Hook::Tick => "on_tick",
        };
        f.write_str(s)
    }
}

/// Event consumer driven by the replay engine (or a live feed).
///
/// All hooks are synchronous; the engine waits for each to return before
/// fetching the next record. Returning an error aborts the run.
pub trait Strategy: Send {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Called once before any record is dispatched. The init segment is
    /// available through `ctx.init_data()`.
    fn on_init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError>;

    /// Called once after `on_init`, immediately before dispatch begins.
    fn on_start(&mut self, _ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_bar(
        &mut self,
        _bar: &BarRecord,
        _ctx: &mut StrategyContext<'_>,
    ) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_tick(
        &mut self,
        _tick: &TickRecord,
        _ctx: &mut StrategyContext<'_>,
    ) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Named counters for the run report.
    fn stats(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}
