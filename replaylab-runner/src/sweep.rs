//! Parameter sweeps: one replay per point of a strategy parameter grid.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, info};

use replaylab_core::store::HistoricalStore;
use replaylab_core::strategy::{create_strategy, StrategyConfig};

use crate::config::{ConfigError, ReplayConfig};
use crate::runner::{run_replay_with_store, ReplayReport, RunError};
use crate::stores::open_store;

/// Parameter grid: each named parameter takes every listed value.
///
/// Parameters not named in the grid keep the base strategy's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    pub axes: BTreeMap<String, Vec<f64>>,
}

impl ParamGrid {
    pub fn new(axes: BTreeMap<String, Vec<f64>>) -> Self {
        Self { axes }
    }

    /// Grid from a config's `[sweep]` table.
    pub fn from_config(config: &ReplayConfig) -> Self {
        Self::new(config.sweep.clone())
    }

    /// Number of grid points before invalid combinations are dropped.
    pub fn size(&self) -> usize {
        self.axes.values().map(Vec::len).product()
    }

    /// Every strategy configuration in the grid that the factory accepts.
    ///
    /// Points the factory rejects (e.g. `fast_window >= slow_window`) are
    /// skipped.
    pub fn generate_configs(&self, base: &StrategyConfig) -> Vec<StrategyConfig> {
        let mut configs = vec![base.clone()];
        for (name, values) in &self.axes {
            configs = configs
                .iter()
                .flat_map(|config| {
                    values
                        .iter()
                        .map(move |&value| config.clone().with_param(name.clone(), value))
                })
                .collect();
        }

        let total = configs.len();
        configs.retain(|config| match create_strategy(config) {
            Ok(_) => true,
            Err(err) => {
                debug!(params = ?config.params, %err, "skipping grid point");
                false
            }
        });
        info!(total, valid = configs.len(), "parameter grid expanded");
        configs
    }
}

/// Parameter sweep executor.
///
/// Runs one replay per grid point, optionally in parallel. Every point gets
/// its own engine and its own store handle.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sweep the config's `[sweep]` grid against the store it names.
    pub fn sweep(&self, config: &ReplayConfig) -> Result<SweepResults, RunError> {
        self.sweep_with(config, || open_store(&config.store))
    }

    /// Sweep with stores from `make_store`, called once per grid point.
    ///
    /// Runs that fail mid-replay come back as failed reports. Configuration
    /// errors abort the whole sweep.
    pub fn sweep_with<F>(&self, config: &ReplayConfig, make_store: F) -> Result<SweepResults, RunError>
    where
        F: Fn() -> Result<Box<dyn HistoricalStore>, ConfigError> + Sync,
    {
        config.validate()?;
        let points = ParamGrid::from_config(config).generate_configs(&config.strategy);

        let run_point = |strategy: &StrategyConfig| -> Result<ReplayReport, RunError> {
            let point = config.with_strategy(strategy.clone());
            run_replay_with_store(&point, make_store()?)
        };

        let reports = if self.parallel {
            points
                .par_iter()
                .map(run_point)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            points.iter().map(run_point).collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(reports))
    }
}

/// Reports from a parameter sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    reports: Vec<ReplayReport>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(reports: Vec<ReplayReport>) -> Self {
        let by_run_id = reports
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { reports, by_run_id }
    }

    pub fn all(&self) -> &[ReplayReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&ReplayReport> {
        self.by_run_id.get(run_id).map(|&i| &self.reports[i])
    }

    /// Reports whose run did not complete.
    pub fn failed(&self) -> Vec<&ReplayReport> {
        self.reports.iter().filter(|r| !r.is_success()).collect()
    }

    /// Completed reports sorted by a strategy statistic, descending. Reports
    /// without the statistic sort last.
    pub fn sorted_by_stat(&self, stat: &str) -> Vec<&ReplayReport> {
        let mut sorted: Vec<_> = self.reports.iter().filter(|r| r.is_success()).collect();
        sorted.sort_by(|a, b| {
            let a = a.stats.get(stat).copied().unwrap_or(f64::NEG_INFINITY);
            let b = b.stats.get(stat).copied().unwrap_or(f64::NEG_INFINITY);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(pairs: &[(&str, &[f64])]) -> ParamGrid {
        ParamGrid::new(
            pairs
                .iter()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn empty_grid_is_the_base_config() {
        let base = StrategyConfig::new("double_ema");
        let configs = ParamGrid::default().generate_configs(&base);
        assert_eq!(configs, vec![base]);
    }

    #[test]
    fn cartesian_product_skips_invalid_points() {
        let grid = axes(&[("fast_window", &[5.0, 10.0, 20.0]), ("slow_window", &[10.0, 30.0])]);
        assert_eq!(grid.size(), 6);

        let configs = grid.generate_configs(&StrategyConfig::new("double_ema"));
        let pairs: Vec<(f64, f64)> = configs
            .iter()
            .map(|c| (c.params["fast_window"], c.params["slow_window"]))
            .collect();
        // 10/10, 20/10 rejected by the factory
        assert_eq!(pairs, vec![(5.0, 10.0), (5.0, 30.0), (10.0, 30.0), (20.0, 30.0)]);
    }

    #[test]
    fn base_params_survive_unswept() {
        let base = StrategyConfig::new("double_ema").with_param("slow_window", 50.0);
        let configs = axes(&[("fast_window", &[3.0, 4.0])]).generate_configs(&base);
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().all(|c| c.params["slow_window"] == 50.0));
    }
}
