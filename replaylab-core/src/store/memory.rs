//! In-process store keyed by collection.
//!
//! Used for tests, benchmarks, and synthetic runs. Records are held in
//! insertion order and sorted at query time, so fixtures may be loaded in any
//! order. A store built with [`MemoryStore::unreachable`] refuses to connect,
//! which exercises the engine's degraded mode.

use std::collections::HashMap;

use tracing::debug;

use super::{sort_by_timestamp, vec_cursor, HistoricalStore, RecordCursor, StoreError};
use crate::domain::{CollectionId, DataRecord, ReplayMode};
use crate::window::TimeRange;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<CollectionId, Vec<DataRecord>>,
    reachable: bool,
    connected: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            reachable: true,
            connected: false,
        }
    }

    /// A store whose `connect` always fails with `Unavailable`.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    /// Seed a collection with records (any order).
    pub fn with_records(
        mut self,
        collection: &CollectionId,
        records: impl IntoIterator<Item = DataRecord>,
    ) -> Self {
        self.collections
            .entry(collection.clone())
            .or_default()
            .extend(records);
        self
    }

    /// Raw contents of a collection, in insertion order.
    pub fn records(&self, collection: &CollectionId) -> &[DataRecord] {
        self.collections
            .get(collection)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }
}

impl HistoricalStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect(&mut self) -> Result<(), StoreError> {
        if self.connected {
            return Ok(());
        }
        if !self.reachable {
            return Err(StoreError::Unavailable("memory store marked unreachable".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn query(
        &self,
        collection: &CollectionId,
        range: &TimeRange,
        mode: ReplayMode,
    ) -> Result<RecordCursor, StoreError> {
        self.ensure_connected()?;

        let mut matched = Vec::new();
        for record in self.records(collection) {
            if !range.contains(record.datetime()) {
                continue;
            }
            if record.mode() != mode {
                return Err(StoreError::schema(
                    collection,
                    "kind",
                    format!("expected a {mode} record, found {}", record.mode()),
                ));
            }
            matched.push(record.clone());
        }
        sort_by_timestamp(&mut matched);
        debug!(%collection, count = matched.len(), "memory query");
        Ok(vec_cursor(matched))
    }

    fn count(&self, collection: &CollectionId, range: &TimeRange) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        Ok(self
            .records(collection)
            .iter()
            .filter(|r| range.contains(r.datetime()))
            .count() as u64)
    }

    fn insert(&mut self, collection: &CollectionId, record: &DataRecord) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.collections
            .entry(collection.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BarRecord, TickRecord};
    use crate::window::{day_start, TimeRange};
    use chrono::NaiveDate;

    fn bar_on(day: u32) -> DataRecord {
        let close = 100.0 + day as f64;
        DataRecord::Bar(BarRecord {
            symbol: "IF0000".into(),
            exchange: String::new(),
            datetime: day_start(NaiveDate::from_ymd_opt(2010, 4, day).unwrap()),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            open_interest: 0.0,
        })
    }

    fn coll() -> CollectionId {
        CollectionId::new("VnTrader_1Min_Db", "IF0000")
    }

    fn connected(store: MemoryStore) -> MemoryStore {
        let mut store = store;
        store.connect().unwrap();
        store
    }

    #[test]
    fn query_sorts_unordered_storage() {
        let store = connected(MemoryStore::new().with_records(
            &coll(),
            vec![bar_on(28), bar_on(20), bar_on(24)],
        ));
        let range = TimeRange::open_ended(bar_on(1).datetime());
        let days: Vec<_> = store
            .query(&coll(), &range, ReplayMode::Bar)
            .unwrap()
            .map(|r| r.unwrap().datetime())
            .collect();
        assert_eq!(days, vec![bar_on(20).datetime(), bar_on(24).datetime(), bar_on(28).datetime()]);
    }

    #[test]
    fn query_respects_range() {
        let store = connected(
            MemoryStore::new().with_records(&coll(), (16..=30).map(bar_on)),
        );
        let range = TimeRange::half_open(bar_on(18).datetime(), bar_on(20).datetime());
        assert_eq!(store.query(&coll(), &range, ReplayMode::Bar).unwrap().count(), 2);
        assert_eq!(store.count(&coll(), &range).unwrap(), 2);
    }

    #[test]
    fn query_rejects_wrong_variant() {
        let tick = DataRecord::Tick(TickRecord::trade("IF0000", bar_on(20).datetime(), 1.0, 1.0));
        let store = connected(MemoryStore::new().with_records(&coll(), vec![tick]));
        let range = TimeRange::open_ended(bar_on(1).datetime());
        let err = store.query(&coll(), &range, ReplayMode::Bar).err().unwrap();
        assert!(matches!(err, StoreError::Schema { ref field, .. } if field == "kind"));
    }

    #[test]
    fn unreachable_store_refuses_connection() {
        let mut store = MemoryStore::unreachable();
        assert!(matches!(store.connect(), Err(StoreError::Unavailable(_))));
        assert!(!store.is_connected());
    }

    #[test]
    fn connect_is_idempotent() {
        let mut store = MemoryStore::new();
        store.connect().unwrap();
        store.connect().unwrap();
        assert!(store.is_connected());
    }

    #[test]
    fn operations_require_connection() {
        let mut store = MemoryStore::new();
        let range = TimeRange::open_ended(bar_on(1).datetime());
        assert!(matches!(store.count(&coll(), &range), Err(StoreError::NotConnected)));
        assert!(matches!(store.insert(&coll(), &bar_on(2)), Err(StoreError::NotConnected)));
    }

    #[test]
    fn unknown_collection_is_empty() {
        let store = connected(MemoryStore::new());
        let range = TimeRange::open_ended(bar_on(1).datetime());
        let other = CollectionId::new("db", "missing");
        assert_eq!(store.query(&other, &range, ReplayMode::Bar).unwrap().count(), 0);
    }
}
