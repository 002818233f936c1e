//! Bar CSV import into a history store.
//!
//! Accepted header names are case-insensitive aliases of
//! `date, time, open, high, low, close, volume, open_interest`. `time` and the
//! last two columns are optional. Dates may be `YYYYMMDD`, `YYYY-MM-DD` or
//! `YYYY/MM/DD`; times `HH:MM:SS` or `HH:MM`.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use replaylab_core::domain::{BarRecord, CollectionId, DataRecord};
use replaylab_core::engine::access::persist;
use replaylab_core::store::{HistoricalStore, StoreError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("store not connected, nothing imported")]
    NotConnected,
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "Date", alias = "DATE")]
    date: String,
    #[serde(default, alias = "Time", alias = "TIME")]
    time: Option<String>,
    #[serde(alias = "Open", alias = "OPEN")]
    open: f64,
    #[serde(alias = "High", alias = "HIGH")]
    high: f64,
    #[serde(alias = "Low", alias = "LOW")]
    low: f64,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
    #[serde(default, alias = "Volume", alias = "VOLUME")]
    volume: Option<f64>,
    #[serde(default, alias = "OpenInterest", alias = "open_int", alias = "OPEN_INTEREST")]
    open_interest: Option<f64>,
}

fn parse_csv_date(s: &str) -> Option<NaiveDate> {
    ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_csv_time(s: &str) -> Option<NaiveTime> {
    ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

impl CsvBar {
    fn into_record(self, symbol: &str, row: usize) -> Result<BarRecord, ImportError> {
        let bad = |reason: String| ImportError::Row { row, reason };
        let date = parse_csv_date(self.date.trim())
            .ok_or_else(|| bad(format!("invalid date '{}'", self.date)))?;
        let time = match self.time.as_deref().map(str::trim) {
            None | Some("") => NaiveTime::MIN,
            Some(t) => parse_csv_time(t).ok_or_else(|| bad(format!("invalid time '{t}'")))?,
        };
        let bar = BarRecord {
            symbol: symbol.to_string(),
            exchange: String::new(),
            datetime: date.and_time(time),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.unwrap_or(0.0),
            open_interest: self.open_interest.unwrap_or(0.0),
        };
        if !bar.is_sane() {
            return Err(bad(format!("inconsistent OHLC at {}", bar.datetime)));
        }
        Ok(bar)
    }
}

/// Parse bar rows for `symbol` from CSV text.
pub fn read_bars(reader: impl Read, symbol: &str) -> Result<Vec<BarRecord>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut bars = Vec::new();
    for (index, row) in rdr.deserialize::<CsvBar>().enumerate() {
        // Row numbers are 1-based and count the header line.
        bars.push(row?.into_record(symbol, index + 2)?);
    }
    Ok(bars)
}

/// Parse a bar CSV file.
pub fn read_bars_file(path: &Path, symbol: &str) -> Result<Vec<BarRecord>, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_bars(file, symbol)
}

/// Connect `store` and append every record to `collection`. Returns the
/// number written.
pub fn import_into(
    store: &mut dyn HistoricalStore,
    collection: &CollectionId,
    records: impl IntoIterator<Item = DataRecord>,
) -> Result<usize, ImportError> {
    store.connect()?;
    let mut written = 0;
    for record in records {
        if !persist(store, collection, &record)? {
            warn!(%collection, "store dropped its connection during import");
            return Err(ImportError::NotConnected);
        }
        written += 1;
    }
    info!(%collection, store = store.name(), written, "import finished");
    Ok(written)
}
