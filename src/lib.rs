//! pquad - parallel midpoint-rule integration
//!
//! A definite integral is split into equal contiguous sub-intervals, one per
//! participant. Every participant integrates its own piece with the midpoint
//! rule and the coordinator (participant 0) combines the partial results.
//!
//! # Architecture
//!
//! - **Compute**: integrands, domain partitioning, the midpoint-rule kernel
//! - **Distributed**: group identity, transports (in-process and TCP), aggregation
//! - **Participant**: one participant's run from partition to result log
//! - **Output**: console lines, the append-only result log, JSON summary

pub mod compute;
pub mod config;
pub mod distributed;
pub mod output;
pub mod participant;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use participant::{FinalResult, RunOutcome};

/// Result type used throughout pquad
pub type Result<T> = anyhow::Result<T>;
