//! Append-only result log
//!
//! The coordinator appends one line per run:
//!
//! ```text
//! <group size> <steps> <coordinator id> <elapsed seconds> <value>
//! ```
//!
//! Existing content is never rewritten. Each line goes out in a single
//! `write` on a file opened in append mode, so concurrent runs sharing a log do
//! not interleave within a line.

use crate::distributed::group::ParticipantId;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Failure to persist a run record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One line of the result log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRecord {
    pub group_size: usize,
    pub steps: u64,
    pub coordinator: ParticipantId,
    pub elapsed: Duration,
    pub value: f64,
}

impl RunRecord {
    /// Render the record as a log line, including the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {:.6} {:.6}\n",
            self.group_size,
            self.steps,
            self.coordinator,
            self.elapsed.as_secs_f64(),
            self.value
        )
    }
}

/// Appends run records to a log file
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    path: PathBuf,
}

impl ResultRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` to the log, creating the file if needed
    pub fn record(&self, record: &RunRecord) -> Result<(), RecordError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RecordError::Open { path: self.path.clone(), source })?;

        file.write_all(record.to_line().as_bytes())
            .map_err(|source| RecordError::Write { path: self.path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> RunRecord {
        RunRecord {
            group_size: 4,
            steps: 100,
            coordinator: 0,
            elapsed: Duration::from_millis(1500),
            value: 1.0000102808,
        }
    }

    #[test]
    fn test_line_format() {
        assert_eq!(sample().to_line(), "4 100 0 1.500000 1.000010\n");
    }

    #[test]
    fn test_creates_missing_log() {
        let dir = TempDir::new().unwrap();
        let recorder = ResultRecorder::new(dir.path().join("output.txt"));

        recorder.record(&sample()).unwrap();

        let contents = fs::read_to_string(recorder.path()).unwrap();
        assert_eq!(contents, "4 100 0 1.500000 1.000010\n");
    }

    #[test]
    fn test_appends_without_touching_existing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");
        fs::write(&path, "2 50 0 0.100000 0.999999\n").unwrap();

        let recorder = ResultRecorder::new(&path);
        recorder.record(&sample()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2 50 0 0.100000 0.999999");

        let fields: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(&fields[..3], &["4", "100", "0"]);
        assert!(fields[3].parse::<f64>().is_ok());
        assert!(fields[4].parse::<f64>().is_ok());
    }

    #[test]
    fn test_open_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let recorder = ResultRecorder::new(dir.path().join("missing").join("output.txt"));

        let err = recorder.record(&sample()).unwrap_err();
        assert!(matches!(err, RecordError::Open { .. }));
        assert!(err.to_string().contains("output.txt"));
    }
}
