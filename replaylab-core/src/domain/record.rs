//! `DataRecord`: the tagged union the engine dispatches, and the replay mode
//! that selects which variant a run carries.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{BarRecord, TickRecord};

/// Which record variant a run replays. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    #[default]
    Bar,
    Tick,
}

impl ReplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayMode::Bar => "bar",
            ReplayMode::Tick => "tick",
        }
    }
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bar" => Ok(ReplayMode::Bar),
            "tick" => Ok(ReplayMode::Tick),
            other => Err(format!("unknown replay mode '{other}' (expected 'bar' or 'tick')")),
        }
    }
}

/// A timestamped bar or tick observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataRecord {
    Bar(BarRecord),
    Tick(TickRecord),
}

impl DataRecord {
    pub fn datetime(&self) -> NaiveDateTime {
        match self {
            DataRecord::Bar(bar) => bar.datetime,
            DataRecord::Tick(tick) => tick.datetime,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            DataRecord::Bar(bar) => &bar.symbol,
            DataRecord::Tick(tick) => &tick.symbol,
        }
    }

    pub fn mode(&self) -> ReplayMode {
        match self {
            DataRecord::Bar(_) => ReplayMode::Bar,
            DataRecord::Tick(_) => ReplayMode::Tick,
        }
    }

    pub fn as_bar(&self) -> Option<&BarRecord> {
        match self {
            DataRecord::Bar(bar) => Some(bar),
            DataRecord::Tick(_) => None,
        }
    }

    pub fn as_tick(&self) -> Option<&TickRecord> {
        match self {
            DataRecord::Tick(tick) => Some(tick),
            DataRecord::Bar(_) => None,
        }
    }
}

impl From<BarRecord> for DataRecord {
    fn from(bar: BarRecord) -> Self {
        DataRecord::Bar(bar)
    }
}

impl From<TickRecord> for DataRecord {
    fn from(tick: TickRecord) -> Self {
        DataRecord::Tick(tick)
    }
}
