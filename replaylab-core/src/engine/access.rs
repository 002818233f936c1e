//! Store access shared by the engine and the strategy context: persistence
//! that tolerates a missing connection, and trailing-window lookups.

use tracing::debug;

use crate::domain::{CollectionId, DataRecord, ReplayMode};
use crate::store::{empty_cursor, HistoricalStore, RecordCursor, StoreError};
use crate::window::{lookback_range, parse_date, WindowError};

/// Errors from a trailing-window lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Append `record` to `collection`. Without a connection this does nothing and
/// returns `Ok(false)`; callers check `is_connected` to tell the cases apart.
pub fn persist(
    store: &mut dyn HistoricalStore,
    collection: &CollectionId,
    record: &DataRecord,
) -> Result<bool, StoreError> {
    if !store.is_connected() {
        debug!(%collection, "persist skipped: store not connected");
        return Ok(false);
    }
    store.insert(collection, record)?;
    Ok(true)
}

/// Fresh cursor over `[reference - lookback_days, reference]`. Empty when the
/// store is not connected.
pub fn recent_window(
    store: &dyn HistoricalStore,
    collection: &CollectionId,
    mode: ReplayMode,
    reference_date: &str,
    lookback_days: i64,
) -> Result<RecordCursor, LookupError> {
    let range = lookback_range(parse_date(reference_date)?, lookback_days)?;
    if !store.is_connected() {
        return Ok(empty_cursor());
    }
    Ok(store.query(collection, &range, mode)?)
}
