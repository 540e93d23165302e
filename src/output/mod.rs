//! Output formatting and persistence
//!
//! - `text`: console lines and the end-of-run summary
//! - `record`: the append-only result log
//! - `json`: the optional JSON run summary

pub mod json;
pub mod record;
pub mod text;

pub use record::{RecordError, ResultRecorder, RunRecord};
