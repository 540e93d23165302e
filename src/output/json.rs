//! JSON run summary
//!
//! Optional machine-readable companion to the result log, written by the
//! coordinator when `output.summary_json` is configured. Unlike the log it is
//! overwritten on every run.

use crate::compute::{Integrand, Interval, RemainderPolicy};
use crate::distributed::aggregation::{AggregationMode, PartialResult};
use crate::distributed::group::ParticipantId;
use crate::util::time::ClockKind;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything the coordinator knows about a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// RFC 3339 completion time
    pub timestamp: String,
    pub integrand: Integrand,
    pub interval: Interval,
    pub group_size: usize,
    pub steps: u64,
    /// Increments left out by the remainder policy
    pub dropped_steps: u64,
    pub coordinator: ParticipantId,
    pub mode: AggregationMode,
    pub remainder: RemainderPolicy,
    pub clock: ClockKind,
    pub elapsed_secs: f64,
    pub value: f64,
    /// Partial results in the order they were combined
    pub partials: Vec<PartialResult>,
}

impl RunSummary {
    /// Current time in the format used by `timestamp`
    pub fn now_timestamp() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

/// Write `summary` to `path` as pretty-printed JSON
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .context("Failed to serialize run summary")?;

    fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write run summary: {}", path.display()))?;

    Ok(())
}
