//! Dual EMA crossover: bar-mode demo strategy.
//!
//! Warms both averages from the initialization segment in `on_init`, then
//! logs a golden cross (fast crosses above slow) or dead cross (fast crosses
//! below slow) for every evaluation bar where one occurs. It tracks the
//! signalled direction but places no orders.

use std::collections::BTreeMap;

use crate::domain::{BarRecord, DataRecord};
use crate::indicators::Ema;

use super::{Strategy, StrategyContext, StrategyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    Golden,
    Dead,
}

#[derive(Debug, Clone)]
pub struct DoubleEma {
    fast: Ema,
    slow: Ema,
    /// `fast - slow` after the previous bar.
    prev_gap: Option<f64>,
    /// +1 after a golden cross, -1 after a dead cross.
    direction: i8,
    warmup_bars: usize,
    bars_seen: usize,
    golden_crosses: usize,
    dead_crosses: usize,
}

impl DoubleEma {
    /// Panics on a zero period. The factory also enforces `fast < slow`.
    pub fn new(fast_window: usize, slow_window: usize) -> Self {
        Self {
            fast: Ema::new(fast_window),
            slow: Ema::new(slow_window),
            prev_gap: None,
            direction: 0,
            warmup_bars: 0,
            bars_seen: 0,
            golden_crosses: 0,
            dead_crosses: 0,
        }
    }

    pub fn direction(&self) -> i8 {
        self.direction
    }

    /// Update both averages with one close; returns a cross if this bar made one.
    fn update(&mut self, close: f64) -> Option<Cross> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let (fast, slow) = (fast?, slow?);
        let gap = fast - slow;
        let cross = match self.prev_gap {
            Some(prev) if prev <= 0.0 && gap > 0.0 => Some(Cross::Golden),
            Some(prev) if prev >= 0.0 && gap < 0.0 => Some(Cross::Dead),
            _ => None,
        };
        self.prev_gap = Some(gap);
        cross
    }
}

impl Strategy for DoubleEma {
    fn name(&self) -> &str {
        "double_ema"
    }

    fn on_init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        let closes: Vec<f64> = ctx
            .init_data()
            .iter()
            .filter_map(DataRecord::as_bar)
            .map(|bar| bar.close)
            .collect();
        for close in &closes {
            self.update(*close);
        }
        self.warmup_bars = closes.len();
        ctx.write_log(format!(
            "double_ema warmed on {} bars (fast={}, slow={})",
            closes.len(),
            self.fast.period(),
            self.slow.period()
        ));
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        if !self.slow.is_ready() {
            ctx.write_log(format!(
                "slow average not ready after warm-up ({} bars short)",
                self.slow.period().saturating_sub(self.warmup_bars)
            ));
        }
        Ok(())
    }

    fn on_bar(&mut self, bar: &BarRecord, ctx: &mut StrategyContext<'_>) -> Result<(), StrategyError> {
        self.bars_seen += 1;
        match self.update(bar.close) {
            Some(Cross::Golden) => {
                self.golden_crosses += 1;
                self.direction = 1;
                ctx.write_log(format!("golden cross at {:.2}", bar.close));
            }
            Some(Cross::Dead) => {
                self.dead_crosses += 1;
                self.direction = -1;
                ctx.write_log(format!("dead cross at {:.2}", bar.close));
            }
            None => {}
        }
        Ok(())
    }

    fn stats(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("warmup_bars".to_string(), self.warmup_bars as f64),
            ("bars_seen".to_string(), self.bars_seen as f64),
            ("golden_crosses".to_string(), self.golden_crosses as f64),
            ("dead_crosses".to_string(), self.dead_crosses as f64),
            ("direction".to_string(), self.direction as f64),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cross_until_both_ready() {
        let mut s = DoubleEma::new(2, 4);
        assert_eq!(s.update(10.0), None);
        assert_eq!(s.update(11.0), None);
        assert_eq!(s.update(12.0), None);
        assert_eq!(s.update(13.0), None);
        assert!(s.slow.is_ready());
    }

    #[test]
    fn detects_golden_then_dead_cross() {
        let mut s = DoubleEma::new(2, 4);
        for close in [20.0, 19.0, 18.0, 17.0, 16.0] {
            s.update(close);
        }
        // Downtrend: fast below slow.
        assert!(s.prev_gap.unwrap() < 0.0);

        let mut crosses = Vec::new();
        for close in [25.0, 30.0, 35.0, 10.0, 5.0, 2.0] {
            if let Some(c) = s.update(close) {
                crosses.push(c);
            }
        }
        assert_eq!(crosses, vec![Cross::Golden, Cross::Dead]);
    }
}
