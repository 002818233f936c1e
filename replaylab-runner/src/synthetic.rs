//! Seeded synthetic history: a multiplicative random walk rendered as bars or
//! ticks. The same seed always produces the same series.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use replaylab_core::domain::{BarRecord, DataRecord, ReplayMode, TickRecord, Timestamp};

/// Spacing between generated records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Second,
    #[default]
    Minute,
    Day,
}

impl Interval {
    pub fn step(&self) -> Duration {
        match self {
            Interval::Second => Duration::seconds(1),
            Interval::Minute => Duration::minutes(1),
            Interval::Day => Duration::days(1),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interval::Second => "second",
            Interval::Minute => "minute",
            Interval::Day => "day",
        })
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "1s" => Ok(Interval::Second),
            "minute" | "1m" => Ok(Interval::Minute),
            "day" | "1d" => Ok(Interval::Day),
            other => Err(format!("unknown interval '{other}' (expected second, minute or day)")),
        }
    }
}

/// Parameters of a synthetic series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticParams {
    pub symbol: String,
    pub start: Timestamp,
    pub interval: Interval,
    pub count: usize,
    pub start_price: f64,
    /// Maximum relative move per step.
    pub volatility: f64,
    pub seed: u64,
}

/// Price increments are rounded to this tick size.
const PRICE_TICK: f64 = 0.2;

fn round_to_tick(price: f64) -> f64 {
    ((price / PRICE_TICK).round() * PRICE_TICK * 10.0).round() / 10.0
}

struct Walk {
    rng: StdRng,
    price: f64,
    volatility: f64,
}

impl Walk {
    fn new(params: &SyntheticParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            price: params.start_price.max(PRICE_TICK),
            volatility: params.volatility.abs(),
        }
    }

    fn step(&mut self) -> f64 {
        let shock: f64 = self.rng.gen_range(-1.0..=1.0);
        self.price = (self.price * (1.0 + self.volatility * shock)).max(PRICE_TICK);
        round_to_tick(self.price)
    }

    fn volume(&mut self) -> f64 {
        f64::from(self.rng.gen_range(1u32..=500))
    }
}

/// Bars: each bar is four walk steps from the previous close.
pub fn generate_bars(params: &SyntheticParams) -> Vec<BarRecord> {
    let mut walk = Walk::new(params);
    let mut close = round_to_tick(walk.price);
    let mut bars = Vec::with_capacity(params.count);
    for i in 0..params.count {
        let open = close;
        let path = [walk.step(), walk.step(), walk.step(), walk.step()];
        close = path[3];
        let high = path.iter().copied().fold(open, f64::max);
        let low = path.iter().copied().fold(open, f64::min);
        bars.push(BarRecord {
            symbol: params.symbol.clone(),
            exchange: String::new(),
            datetime: params.start + params.interval.step() * i as i32,
            open,
            high,
            low,
            close,
            volume: walk.volume(),
            open_interest: 0.0,
        });
    }
    bars
}

/// Ticks: one trade per step, quoted one price tick either side.
pub fn generate_ticks(params: &SyntheticParams) -> Vec<TickRecord> {
    let mut walk = Walk::new(params);
    (0..params.count)
        .map(|i| {
            let price = walk.step();
            let volume = walk.volume();
            let mut tick = TickRecord::trade(
                params.symbol.clone(),
                params.start + params.interval.step() * i as i32,
                price,
                volume,
            );
            tick.bid_prices[0] = round_to_tick(price - PRICE_TICK);
            tick.ask_prices[0] = round_to_tick(price + PRICE_TICK);
            tick.bid_volumes[0] = 1.0;
            tick.ask_volumes[0] = 1.0;
            tick
        })
        .collect()
}

/// Records of the variant `mode` selects.
pub fn generate(params: &SyntheticParams, mode: ReplayMode) -> Vec<DataRecord> {
    match mode {
        ReplayMode::Bar => generate_bars(params).into_iter().map(DataRecord::from).collect(),
        ReplayMode::Tick => generate_ticks(params).into_iter().map(DataRecord::from).collect(),
    }
}
