//! Serializable replay configuration, loaded from TOML.
//!
//! ```toml
//! [store]
//! kind = "mongo"
//! host = "localhost"
//! port = 27017
//!
//! [replay]
//! mode = "bar"
//! start_date = "20100416"
//! warmup_days = 10
//! database = "VnTrader_1Min_Db"
//! collection = "IF0000"
//!
//! [strategy]
//! name = "double_ema"
//! params = { fast_window = 10, slow_window = 60 }
//!
//! [sweep]
//! fast_window = [5, 10, 20]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use replaylab_core::domain::{CollectionId, ReplayMode};
use replaylab_core::strategy::StrategyConfig;
use replaylab_core::window::{parse_end_date, TimeWindow};

/// Unique identifier for a replay run (content-addressable hash).
pub type RunId = String;

/// Errors loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which backend serves history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mongo,
    Jsonl,
    Memory,
}

/// Connection settings for the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub replica_set: Option<String>,
    #[serde(default)]
    pub read_preference: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Root directory of a JSON-lines store.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_connect_timeout_ms() -> u64 {
    500
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            host: default_host(),
            port: default_port(),
            replica_set: None,
            read_preference: None,
            username: None,
            password: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            root: None,
        }
    }
}

/// What to replay and over which window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySettings {
    pub mode: ReplayMode,
    pub start_date: String,
    #[serde(default = "default_warmup_days")]
    pub warmup_days: i64,
    /// Inclusive end date; empty means unbounded.
    #[serde(default)]
    pub end_date: String,
    pub database: String,
    pub collection: String,
}

fn default_warmup_days() -> i64 {
    10
}

impl ReplaySettings {
    pub fn collection_id(&self) -> CollectionId {
        CollectionId::new(&self.database, &self.collection)
    }

    /// The window these settings describe.
    pub fn window(&self) -> Result<TimeWindow, ConfigError> {
        let invalid = |e: replaylab_core::window::WindowError| ConfigError::Invalid(e.to_string());
        let end = parse_end_date(&self.end_date).map_err(invalid)?;
        Ok(TimeWindow::from_start(&self.start_date, self.warmup_days)
            .map_err(invalid)?
            .with_end(end))
    }
}

/// Complete configuration for one replay run (or a sweep of them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub store: StoreSettings,
    pub replay: ReplaySettings,
    pub strategy: StrategyConfig,
    /// Parameter name → values to sweep over.
    #[serde(default)]
    pub sweep: BTreeMap<String, Vec<f64>>,
}

impl ReplayConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check everything that can be checked without touching the store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.replay.window()?;
        if !self.replay.collection_id().is_set() {
            return Err(ConfigError::Invalid(
                "replay.database and replay.collection must be non-empty".into(),
            ));
        }
        if self.strategy.name.is_empty() {
            return Err(ConfigError::Invalid("strategy.name must be set".into()));
        }
        if self.store.kind == StoreKind::Jsonl && self.store.root.is_none() {
            return Err(ConfigError::Invalid("store.root is required for a jsonl store".into()));
        }
        if let Some((name, _)) = self.sweep.iter().find(|(_, values)| values.is_empty()) {
            return Err(ConfigError::Invalid(format!("sweep.{name} has no values")));
        }
        Ok(())
    }

    /// Deterministic hash of what the run replays and how.
    ///
    /// Store connection settings are left out: the same replay against a
    /// different host, or with different credentials, keeps its id.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(&(&self.replay, &self.strategy)).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Same configuration with a different strategy.
    pub fn with_strategy(&self, strategy: StrategyConfig) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }
}
