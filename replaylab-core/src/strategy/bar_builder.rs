//! Tick-to-bar aggregator: tick-mode record-generation strategy.
//!
//! Rolls ticks into fixed-interval OHLCV bars and persists each completed bar
//! to `{source collection}_{n}min` in the source database. A bar is written
//! when the first tick of the next interval arrives, so the final, still-open
//! interval of a run is never persisted.

use std::collections::BTreeMap;

use chrono::{Duration, DurationRound};

use crate::domain::{BarRecord, CollectionId, DataRecord, TickRecord, Timestamp};

use super::{Strategy, StrategyContext, StrategyError};

#[derive(Debug, Clone)]
pub struct BarBuilder {
    interval_minutes: u32,
    current: Option<BarRecord>,
    target: Option<CollectionId>,
    ticks_seen: usize,
    bars_written: usize,
}

impl BarBuilder {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
            current: None,
            target: None,
            ticks_seen: 0,
            bars_written: 0,
        }
    }

    /// Collection completed bars are written to.
    pub fn target_for(&self, source: &CollectionId) -> CollectionId {
        CollectionId::new(
            source.database.clone(),
            format!("{}_{}min", source.collection, self.interval_minutes),
        )
    }

    /// Start of the interval containing `ts`.
    fn bucket(&self, ts: Timestamp) -> Timestamp {
        let interval = Duration::minutes(i64::from(self.interval_minutes));
        ts.duration_trunc(interval).unwrap_or(ts)
    }

    fn open_bar(&self, tick: &TickRecord, start: Timestamp) -> BarRecord {
        BarRecord {
            symbol: tick.symbol.clone(),
            exchange: tick.exchange.clone(),
            datetime: start,
            open: tick.last_price,
            high: tick.last_price,
            low: tick.last_price,
            close: tick.last_price,
            volume: tick.volume,
            open_interest: tick.open_interest,
        }
    }

    /// Fold a tick in; returns the bar it completed, if any.
    fn push(&mut self, tick: &TickRecord) -> Option<BarRecord> {
        let start = self.bucket(tick.datetime);
        match self.current.as_mut() {
            Some(bar) if bar.datetime == start => {
                bar.high = bar.high.max(tick.last_price);
                bar.low = bar.low.min(tick.last_price);
                bar.close = tick.last_price;
                bar.volume += tick.volume;
                bar.open_interest = tick.open_interest;
                None
            }
            _ => {
                let fresh = self.open_bar(tick, start);
                self.current.replace(fresh)
            }
        }
    }
}

impl Strategy for BarBuilder {
    fn name(&self) -> &str {
        "bar_builder"
    }

    fn on_init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        let target = self.target_for(ctx.source());
        ctx.write_log(format!("bar_builder writing {}-minute bars to {target}", self.interval_minutes));
        self.target = Some(target);
        Ok(())
    }

    fn on_tick(&mut self, tick: &TickRecord, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        self.ticks_seen += 1;
        if let Some(done) = self.push(tick) {
            let target = match &self.target {
                Some(t) => t.clone(),
                None => self.target_for(ctx.source()),
            };
            ctx.persist(&target, &DataRecord::Bar(done))?;
            self.bars_written += 1;
        }
        Ok(())
    }

    fn stats(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("ticks_seen".to_string(), self.ticks_seen as f64),
            ("bars_written".to_string(), self.bars_written as f64),
        ])
    }
}
