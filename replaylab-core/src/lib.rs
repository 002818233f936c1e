//! ReplayLab Core: record types, time windows, store contract, strategy
//! callbacks, and the replay engine.
//!
//! This crate contains the heart of historical replay:
//! - Bar and tick records plus the replay mode that selects between them
//! - `TimeWindow` splitting history into init and evaluation segments
//! - `HistoricalStore` trait with an in-memory implementation
//! - `Strategy` callbacks, `StrategyContext`, and a strategy factory
//! - `ReplayEngine` state machine with ordered, single-threaded dispatch

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod store;
pub mod strategy;
pub mod window;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the engine and everything it owns can move to a
    /// worker thread, so parameter sweeps can run one engine per thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::BarRecord>();
        require_sync::<domain::BarRecord>();
        require_send::<domain::TickRecord>();
        require_sync::<domain::TickRecord>();
        require_send::<domain::DataRecord>();
        require_sync::<domain::DataRecord>();
        require_send::<domain::CollectionId>();
        require_sync::<domain::CollectionId>();

        // Window types
        require_send::<window::TimeWindow>();
        require_sync::<window::TimeWindow>();
        require_send::<window::TimeRange>();
        require_sync::<window::TimeRange>();

        // Engine types
        require_send::<engine::ReplayEngine>();
        require_send::<engine::RunLog>();
        require_sync::<engine::RunLog>();
        require_send::<engine::RunSummary>();
        require_sync::<engine::RunSummary>();
        require_send::<engine::EngineError>();

        // Stores and strategies
        require_send::<store::MemoryStore>();
        require_sync::<store::MemoryStore>();
        require_send::<store::RecordCursor>();
        require_send::<strategy::DoubleEma>();
        require_send::<strategy::BarBuilder>();
        require_send::<strategy::StrategyConfig>();
        require_sync::<strategy::StrategyConfig>();
    }

    /// Compile-time check: strategies are object safe and their hooks see the
    /// engine only through `StrategyContext`.
    #[allow(dead_code)]
    fn assert_strategy_object_safe(
        strategy: &mut dyn strategy::Strategy,
        bar: &domain::BarRecord,
        tick: &domain::TickRecord,
        ctx: &mut strategy::StrategyContext<'_>,
    ) -> Result<(), strategy::StrategyError> {
        let _: Box<dyn strategy::Strategy> = Box::new(strategy::DoubleEma::new(3, 8));
        let _: Box<dyn strategy::Strategy> = Box::new(strategy::BarBuilder::new(1));
        strategy.on_bar(bar, ctx)?;
        strategy.on_tick(tick, ctx)
    }
}
