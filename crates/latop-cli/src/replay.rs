//! Operation replay.
//!
//! Reads recorded operations as JSON lines and feeds them through the same
//! filtering and classification a live request path would apply.

use std::io::BufRead;

use latop_core::{CommandCategory, LatencyReport, ResourceKey, UsageRegistry};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::error::CliError;

fn default_user() -> bool {
    true
}

/// One completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Target namespace (`db.collection`).
    pub ns: String,
    /// Command name, e.g. `find`.
    pub command: String,
    /// Elapsed time in microseconds.
    pub latency_micros: u64,
    /// The operation failed.
    #[serde(default)]
    pub error: bool,
    /// The operation came from an external client connection.
    #[serde(default = "default_user")]
    pub user: bool,
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Operations recorded into the registry.
    pub recorded: u64,
    /// Operations whose namespace is never recorded.
    pub skipped: u64,
}

/// Record one operation, unless its namespace is filtered out.
///
/// Returns whether the operation was recorded.
pub fn apply(registry: &UsageRegistry, op: &Operation) -> bool {
    let Some(key) = ResourceKey::from_namespace(&op.ns) else {
        debug!(ns = %op.ns, "skipping unrecorded namespace");
        return false;
    };
    let category = CommandCategory::from_command_name(&op.command);
    registry.record(&key, category, op.latency_micros, op.error, op.user);
    true
}

/// Replay every operation from `reader` into `registry`.
///
/// Blank lines are ignored. The first malformed line aborts the replay.
pub fn replay<R: BufRead>(reader: R, registry: &UsageRegistry) -> Result<ReplaySummary, CliError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let op: Operation = serde_json::from_str(trimmed).map_err(|source| CliError::Parse {
            line: index + 1,
            source,
        })?;

        if apply(registry, &op) {
            summary.recorded += 1;
        } else {
            summary.skipped += 1;
        }
    }

    info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        "replay finished"
    );
    Ok(summary)
}

/// Render a report in the requested format.
pub fn render(report: &LatencyReport, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => report.to_json()?,
        OutputFormat::Pretty => report.to_json_pretty()?,
        OutputFormat::Prometheus => report.to_prometheus(),
    })
}
