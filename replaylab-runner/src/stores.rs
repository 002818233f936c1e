//! Store construction from `[store]` settings.

use replaylab_core::store::{HistoricalStore, MemoryStore};

use crate::config::{ConfigError, StoreKind, StoreSettings};
use crate::jsonl::JsonlStore;
use crate::mongo::MongoStore;

/// Build an unconnected store for `settings`. Each call returns an
/// independent handle.
pub fn open_store(settings: &StoreSettings) -> Result<Box<dyn HistoricalStore>, ConfigError> {
    match settings.kind {
        StoreKind::Mongo => Ok(Box::new(MongoStore::new(settings.clone()))),
        StoreKind::Jsonl => {
            let root = settings
                .root
                .clone()
                .ok_or_else(|| ConfigError::Invalid("store.root is required for a jsonl store".into()))?;
            Ok(Box::new(JsonlStore::new(root)))
        }
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_kind() {
        let mongo = open_store(&StoreSettings::default()).unwrap();
        assert_eq!(mongo.name(), "mongo");
        assert!(!mongo.is_connected());

        let jsonl = open_store(&StoreSettings {
            kind: StoreKind::Jsonl,
            root: Some("data".into()),
            ..StoreSettings::default()
        })
        .unwrap();
        assert_eq!(jsonl.name(), "jsonl");

        let memory = open_store(&StoreSettings {
            kind: StoreKind::Memory,
            ..StoreSettings::default()
        })
        .unwrap();
        assert_eq!(memory.name(), "memory");
    }

    #[test]
    fn jsonl_without_root_rejected() {
        let settings = StoreSettings {
            kind: StoreKind::Jsonl,
            ..StoreSettings::default()
        };
        assert!(matches!(open_store(&settings), Err(ConfigError::Invalid(_))));
    }
}
