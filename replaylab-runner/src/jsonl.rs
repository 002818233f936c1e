//! JSON-lines history store for offline replay.
//!
//! Layout: `{root}/{database}/{collection}.jsonl`, one tagged `DataRecord`
//! per line (`{"kind":"bar",...}`). Files are read in full on every query and
//! sorted by timestamp, so appends may arrive in any order. A missing
//! collection file is an empty collection.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use replaylab_core::domain::{CollectionId, DataRecord, ReplayMode};
use replaylab_core::store::{sort_by_timestamp, vec_cursor, HistoricalStore, RecordCursor, StoreError};
use replaylab_core::window::TimeRange;

#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
    connected: bool,
}

impl JsonlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            connected: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `collection`.
    pub fn path_for(&self, collection: &CollectionId) -> PathBuf {
        self.root
            .join(&collection.database)
            .join(format!("{}.jsonl", collection.collection))
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    /// Every record in `collection` inside `range`, in file order.
    fn read_range(&self, collection: &CollectionId, range: &TimeRange) -> Result<Vec<DataRecord>, StoreError> {
        let path = self.path_for(collection);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::query(collection, e.to_string())),
        };

        let mut records = Vec::new();
        for (index, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::query(collection, e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: DataRecord = serde_json::from_str(&line).map_err(|e| {
                StoreError::schema(collection, &format!("line {}", index + 1), e.to_string())
            })?;
            if range.contains(record.datetime()) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl HistoricalStore for JsonlStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn connect(&mut self) -> Result<(), StoreError> {
        if self.connected {
            return Ok(());
        }
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::Config("store.root is empty".into()));
        }
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
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
        let mut records = self.read_range(collection, range)?;
        if let Some(other) = records.iter().find(|r| r.mode() != mode) {
            return Err(StoreError::schema(
                collection,
                "kind",
                format!("expected a {mode} record, found {}", other.mode()),
            ));
        }
        sort_by_timestamp(&mut records);
        debug!(%collection, count = records.len(), "jsonl query");
        Ok(vec_cursor(records))
    }

    fn count(&self, collection: &CollectionId, range: &TimeRange) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        Ok(self.read_range(collection, range)?.len() as u64)
    }

    fn insert(&mut self, collection: &CollectionId, record: &DataRecord) -> Result<(), StoreError> {
        self.ensure_connected()?;
        let line = serde_json::to_string(record).map_err(|e| StoreError::insert(collection, e.to_string()))?;
        let path = self.path_for(collection);
        let write = || -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{line}")?;
            file.flush()
        };
        write().map_err(|e| StoreError::insert(collection, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use replaylab_core::domain::{BarRecord, TickRecord, Timestamp};
    use replaylab_core::window::day_start;

    fn day(d: u32) -> Timestamp {
        day_start(NaiveDate::from_ymd_opt(2010, 4, d).unwrap())
    }

    fn bar(d: u32) -> DataRecord {
        DataRecord::Bar(BarRecord {
            symbol: "IF0000".into(),
            exchange: String::new(),
            datetime: day(d),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: d as f64,
            volume: 1.0,
            open_interest: 0.0,
        })
    }

    fn coll() -> CollectionId {
        CollectionId::new("VnTrader_1Min_Db", "IF0000")
    }

    fn connected(dir: &Path) -> JsonlStore {
        let mut store = JsonlStore::new(dir);
        store.connect().unwrap();
        store
    }

    #[test]
    fn insert_then_query_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = connected(dir.path());
        for d in [28, 18, 27, 30] {
            store.insert(&coll(), &bar(d)).unwrap();
        }
        assert!(store.path_for(&coll()).ends_with("VnTrader_1Min_Db/IF0000.jsonl"));

        let range = TimeRange::closed(day(26), day(30));
        let closes: Vec<f64> = store
            .query(&coll(), &range, ReplayMode::Bar)
            .unwrap()
            .map(|r| r.unwrap().as_bar().unwrap().close)
            .collect();
        assert_eq!(closes, vec![27.0, 28.0, 30.0]);
        assert_eq!(store.count(&coll(), &range).unwrap(), 3);
    }

    #[test]
    fn missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = connected(dir.path());
        let range = TimeRange::open_ended(day(1));
        assert_eq!(store.query(&coll(), &range, ReplayMode::Bar).unwrap().count(), 0);
    }

    #[test]
    fn malformed_line_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = connected(dir.path());
        store.insert(&coll(), &bar(27)).unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.path_for(&coll()))
            .unwrap();
        writeln!(file, r#"{{"kind":"bar","symbol":"IF0000"}}"#).unwrap();

        let err = store
            .query(&coll(), &TimeRange::open_ended(day(1)), ReplayMode::Bar)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Schema { ref field, .. } if field == "line 2"));
    }

    #[test]
    fn mixed_variants_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = connected(dir.path());
        store.insert(&coll(), &bar(27)).unwrap();
        store
            .insert(&coll(), &DataRecord::Tick(TickRecord::trade("IF0000", day(28), 1.0, 1.0)))
            .unwrap();
        let err = store
            .query(&coll(), &TimeRange::open_ended(day(1)), ReplayMode::Bar)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Schema { ref field, .. } if field == "kind"));
    }

    #[test]
    fn missing_root_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(dir.path().join("absent"));
        assert!(matches!(store.connect(), Err(StoreError::Unavailable(_))));
        assert!(!store.is_connected());
    }

    #[test]
    fn empty_root_is_config_error() {
        let mut store = JsonlStore::new("");
        assert!(matches!(store.connect(), Err(StoreError::Config(_))));
    }
}
