//! Domain types: bar and tick records, the record union, and replay mode.

pub mod bar;
pub mod record;
pub mod tick;

pub use bar::BarRecord;
pub use record::{DataRecord, ReplayMode};
pub use tick::{TickRecord, DEPTH};

/// Simulated-clock timestamp. Recorded data carries exchange-local wall time
/// with no zone attached.
pub type Timestamp = chrono::NaiveDateTime;

/// Identifies a collection inside a store: a (database, collection) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct CollectionId {
    pub database: String,
    pub collection: String,
}

impl CollectionId {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Both names are non-empty.
    pub fn is_set(&self) -> bool {
        !self.database.is_empty() && !self.collection.is_empty()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}
