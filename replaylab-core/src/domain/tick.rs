//! Tick record: a single quote/trade snapshot.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of order book levels carried on a tick.
pub const DEPTH: usize = 5;

/// Level-5 quote snapshot plus last trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    pub datetime: NaiveDateTime,
    pub last_price: f64,
    pub volume: f64,
    #[serde(default)]
    pub open_interest: f64,
    #[serde(default)]
    pub upper_limit: f64,
    #[serde(default)]
    pub lower_limit: f64,
    #[serde(default)]
    pub bid_prices: [f64; DEPTH],
    #[serde(default)]
    pub bid_volumes: [f64; DEPTH],
    #[serde(default)]
    pub ask_prices: [f64; DEPTH],
    #[serde(default)]
    pub ask_volumes: [f64; DEPTH],
}

impl TickRecord {
    /// A tick carrying only a last trade; book levels are zero.
    pub fn trade(symbol: impl Into<String>, datetime: NaiveDateTime, price: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: String::new(),
            datetime,
            last_price: price,
            volume,
            open_interest: 0.0,
            upper_limit: 0.0,
            lower_limit: 0.0,
            bid_prices: [0.0; DEPTH],
            bid_volumes: [0.0; DEPTH],
            ask_prices: [0.0; DEPTH],
            ask_volumes: [0.0; DEPTH],
        }
    }

    /// Top-of-book midpoint, if both sides are quoted.
    pub fn mid_price(&self) -> Option<f64> {
        let bid = self.bid_prices[0];
        let ask = self.ask_prices[0];
        (bid > 0.0 && ask > 0.0).then(|| (bid + ask) / 2.0)
    }

    /// Top-of-book spread, if both sides are quoted.
    pub fn spread(&self) -> Option<f64> {
        let bid = self.bid_prices[0];
        let ask = self.ask_prices[0];
        (bid > 0.0 && ask > 0.0).then(|| ask - bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2010, 4, 27)
            .unwrap()
            .and_hms_opt(9, 15, 3)
            .unwrap()
    }

    #[test]
    fn trade_tick_has_no_quotes() {
        let tick = TickRecord::trade("IF0000", ts(), 3301.2, 4.0);
        assert_eq!(tick.mid_price(), None);
        assert_eq!(tick.spread(), None);
    }

    #[test]
    fn mid_and_spread_from_top_of_book() {
        let mut tick = TickRecord::trade("IF0000", ts(), 3301.2, 4.0);
        tick.bid_prices[0] = 3301.0;
        tick.ask_prices[0] = 3301.4;
        assert!((tick.mid_price().unwrap() - 3301.2).abs() < 1e-9);
        assert!((tick.spread().unwrap() - 0.4).abs() < 1e-9);
    }
}
