//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[period-1] = SMA of the first `period` values.
//! Lookback: period - 1.

/// Streaming EMA fed one value at a time.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// Feed one value; returns the EMA once the seed window is full.
    /// A NaN input is ignored.
    pub fn update(&mut self, x: f64) -> Option<f64> {
        if x.is_nan() {
            return self.value;
        }
        self.seen += 1;
        self.value = match self.value {
            Some(prev) => Some(self.alpha * x + (1.0 - self.alpha) * prev),
            None => {
                self.seed_sum += x;
                (self.seen == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    #[should_panic(expected = "EMA period must be >= 1")]
    fn zero_period_rejected() {
        Ema::new(0);
    }

    #[test]
    fn ema_period_1_equals_input() {
        let mut ema = Ema::new(1);
        assert_eq!(ema.update(100.0), Some(100.0));
        assert_eq!(ema.update(200.0), Some(200.0));
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 2/(3+1) = 0.5
        // Seed after 3 values: SMA(10,11,12) = 11.0
        // 0.5*13 + 0.5*11 = 12.0, then 0.5*14 + 0.5*12 = 13.0
        let mut ema = Ema::new(3);
        assert_eq!(ema.update(10.0), None);
        assert_eq!(ema.update(11.0), None);
        assert!((ema.update(12.0).unwrap() - 11.0).abs() < EPS);
        assert!((ema.update(13.0).unwrap() - 12.0).abs() < EPS);
        assert!((ema.update(14.0).unwrap() - 13.0).abs() < EPS);
        assert_eq!(ema.lookback(), 2);
    }

    #[test]
    fn nan_input_is_skipped() {
        let mut ema = Ema::new(2);
        ema.update(10.0);
        assert_eq!(ema.update(f64::NAN), None);
        assert!((ema.update(12.0).unwrap() - 11.0).abs() < EPS);
    }
}
