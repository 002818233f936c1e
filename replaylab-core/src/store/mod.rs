//! Historical store contract and structured error types.
//!
//! The `HistoricalStore` trait abstracts over document databases (MongoDB,
//! JSON-lines files, in-memory fixtures) so the replay engine can be driven
//! from any of them and mocked in tests.
//!
//! Ordering contract: every `query` yields records sorted by timestamp
//! ascending. Implementations sort explicitly; storage order is never trusted.

pub mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use crate::domain::{CollectionId, DataRecord, ReplayMode};
use crate::window::TimeRange;

/// Structured error types for store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store configuration error: {0}")]
    Config(String),

    #[error("store is not connected")]
    NotConnected,

    #[error("query on {collection} failed: {reason}")]
    Query { collection: String, reason: String },

    #[error("malformed document in {collection}: field '{field}' {reason}")]
    Schema {
        collection: String,
        field: String,
        reason: String,
    },

    #[error("insert into {collection} failed: {reason}")]
    Insert { collection: String, reason: String },
}

impl StoreError {
    pub fn query(collection: &CollectionId, reason: impl Into<String>) -> Self {
        StoreError::Query {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    pub fn schema(collection: &CollectionId, field: &str, reason: impl Into<String>) -> Self {
        StoreError::Schema {
            collection: collection.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn insert(collection: &CollectionId, reason: impl Into<String>) -> Self {
        StoreError::Insert {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}

/// Forward-only sequence of records from a range query.
pub type RecordCursor = Box<dyn Iterator<Item = Result<DataRecord, StoreError>> + Send>;

/// A cursor over nothing.
pub fn empty_cursor() -> RecordCursor {
    Box::new(std::iter::empty())
}

/// Wrap an already-sorted vector of records as a cursor.
pub fn vec_cursor(records: Vec<DataRecord>) -> RecordCursor {
    Box::new(records.into_iter().map(Ok))
}

/// Stable ascending sort on the timestamp field.
pub fn sort_by_timestamp(records: &mut [DataRecord]) {
    records.sort_by_key(|r| r.datetime());
}

/// Trait for historical record stores.
///
/// Implementations own their connection. `connect` is idempotent: calling it
/// on a connected store does nothing.
pub trait HistoricalStore: Send {
    /// Human-readable name of this store backend.
    fn name(&self) -> &str;

    /// Establish the connection.
    ///
    /// `StoreError::Unavailable` when the server cannot be reached,
    /// `StoreError::Config` when connection parameters are malformed.
    fn connect(&mut self) -> Result<(), StoreError>;

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;

    /// Records in `collection` whose timestamp falls in `range`, parsed as the
    /// variant selected by `mode`, ascending by timestamp.
    fn query(
        &self,
        collection: &CollectionId,
        range: &TimeRange,
        mode: ReplayMode,
    ) -> Result<RecordCursor, StoreError>;

    /// Number of documents in `collection` whose timestamp falls in `range`.
    fn count(&self, collection: &CollectionId, range: &TimeRange) -> Result<u64, StoreError>;

    /// Append one record's field map to `collection`.
    fn insert(&mut self, collection: &CollectionId, record: &DataRecord) -> Result<(), StoreError>;
}
