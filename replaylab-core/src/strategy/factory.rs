//! Factory: converts a `StrategyConfig` (type name + parameter map) into a
//! runtime strategy object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BarBuilder, DoubleEma, Strategy};

/// Errors that can occur during strategy construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown strategy type: {0}")]
    UnknownStrategy(String),
    #[error("Invalid parameter '{name}' for {strategy}: {reason}")]
    InvalidParam {
        strategy: String,
        name: String,
        reason: String,
    },
}

/// Strategy type name plus numeric parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// Strategy type names `create_strategy` understands.
pub const STRATEGY_TYPES: &[&str] = &["double_ema", "bar_builder"];

/// Extract a named positive integer parameter, falling back to `default`.
fn param_period(config: &StrategyConfig, name: &str, default: usize) -> Result<usize, FactoryError> {
    match config.params.get(name).copied() {
        None => Ok(default),
        Some(v) if v >= 1.0 && v.fract() == 0.0 => Ok(v as usize),
        Some(v) => Err(FactoryError::InvalidParam {
            strategy: config.name.clone(),
            name: name.to_string(),
            reason: format!("expected a positive integer, got {v}"),
        }),
    }
}

/// Create a strategy from a `StrategyConfig`.
pub fn create_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, FactoryError> {
    match config.name.as_str() {
        "double_ema" => {
            let fast = param_period(config, "fast_window", 10)?;
            let slow = param_period(config, "slow_window", 60)?;
            if fast >= slow {
                return Err(FactoryError::InvalidParam {
                    strategy: config.name.clone(),
                    name: "fast_window".into(),
                    reason: format!("must be below slow_window ({fast} >= {slow})"),
                });
            }
            Ok(Box::new(DoubleEma::new(fast, slow)))
        }
        "bar_builder" => {
            let minutes = param_period(config, "interval_minutes", 1)?;
            Ok(Box::new(BarBuilder::new(minutes as u32)))
        }
        other => Err(FactoryError::UnknownStrategy(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_double_ema_with_defaults() {
        let strategy = create_strategy(&StrategyConfig::new("double_ema")).unwrap();
        assert_eq!(strategy.name(), "double_ema");
    }

    #[test]
    fn creates_bar_builder() {
        let config = StrategyConfig::new("bar_builder").with_param("interval_minutes", 5.0);
        assert_eq!(create_strategy(&config).unwrap().name(), "bar_builder");
    }

    #[test]
    fn unknown_type_rejected() {
        let err = create_strategy(&StrategyConfig::new("turtle")).err().unwrap();
        assert_eq!(err, FactoryError::UnknownStrategy("turtle".into()));
    }

    #[test]
    fn fractional_period_rejected() {
        let config = StrategyConfig::new("double_ema").with_param("fast_window", 2.5);
        assert!(matches!(
            create_strategy(&config),
            Err(FactoryError::InvalidParam { .. })
        ));
    }

    #[test]
    fn fast_must_be_below_slow() {
        let config = StrategyConfig::new("double_ema")
            .with_param("fast_window", 30.0)
            .with_param("slow_window", 20.0);
        assert!(matches!(
            create_strategy(&config),
            Err(FactoryError::InvalidParam { ref name, .. }) if name == "fast_window"
        ));
    }

    #[test]
    fn every_listed_type_constructs() {
        for name in STRATEGY_TYPES {
            assert!(create_strategy(&StrategyConfig::new(*name)).is_ok(), "{name}");
        }
    }
}
