//! Report artifacts: JSON manifest and run-log CSV.
//!
//! All persisted reports include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use replaylab_core::engine::LogEntry;

use crate::runner::{ReplayReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ReplayReport` to pretty JSON.
pub fn export_json(report: &ReplayReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ReplayReport to JSON")
}

/// Deserialize a `ReplayReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ReplayReport> {
    let report: ReplayReport =
        serde_json::from_str(json).context("failed to deserialize ReplayReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the run log as CSV. Columns: time, message. `time` is empty for
/// entries written before the first record.
pub fn export_log_csv(log: &[LogEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "message"])?;
    for entry in log {
        let time = entry.time.map(|t| t.to_string()).unwrap_or_default();
        wtr.write_record([time.as_str(), entry.message.as_str()])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write a run's artifacts to `{output_dir}/{strategy}_{run id prefix}/`:
/// - `report.json`: the full `ReplayReport`
/// - `log.csv`: the run log
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &ReplayReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("{}_{}", report.strategy.name, report.short_id()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("log.csv"), export_log_csv(&report.log)?)?;

    Ok(run_dir)
}

/// Load a `ReplayReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<ReplayReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
