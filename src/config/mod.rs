//! Configuration module
//!
//! Handles the command line, the optional TOML configuration file, and validation.
//!
//! A run is configured in three layers, later layers winning:
//!
//! 1. built-in defaults (cos over [0, π/2], 100000000 steps, ordered gather)
//! 2. the TOML file named by `PQUAD_CONFIG`, if set
//! 3. the positional step count on the command line

pub mod cli;
pub mod toml;
pub mod validator;

use crate::compute::{Integrand, Interval, RemainderPolicy};
use crate::distributed::aggregation::AggregationMode;
use crate::distributed::protocol::{Tag, PARTIAL_RESULT_TAG};
use crate::util::time::ClockKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the TOML configuration file
pub const ENV_CONFIG: &str = "PQUAD_CONFIG";

/// Environment variable enabling debug output
pub const ENV_DEBUG: &str = "PQUAD_DEBUG";

/// Step count used when none is given on the command line
pub const DEFAULT_STEPS: u64 = 100_000_000;

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// What to integrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Lower limit of integration
    #[serde(default)]
    pub lower: f64,
    /// Upper limit of integration
    #[serde(default = "default_upper")]
    pub upper: f64,
    /// Function to integrate
    #[serde(default)]
    pub integrand: Integrand,
    /// Total number of increments across the whole interval
    #[serde(default = "default_steps")]
    pub default_steps: u64,
}

fn default_upper() -> f64 {
    std::f64::consts::FRAC_PI_2
}

fn default_steps() -> u64 {
    DEFAULT_STEPS
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: default_upper(),
            integrand: Integrand::default(),
            default_steps: default_steps(),
        }
    }
}

impl IntegrationConfig {
    pub fn interval(&self) -> Interval {
        Interval::new(self.lower, self.upper)
    }
}

/// How partial results are combined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Combination strategy
    #[serde(default)]
    pub mode: AggregationMode,
    /// Tag carried by partial-result messages
    #[serde(default = "default_tag")]
    pub tag: Tag,
    /// Handling of the increments that do not divide evenly
    #[serde(default)]
    pub remainder: RemainderPolicy,
}

fn default_tag() -> Tag {
    PARTIAL_RESULT_TAG
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::default(),
            tag: default_tag(),
            remainder: RemainderPolicy::default(),
        }
    }
}

/// Where results go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Append-only result log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Optional JSON run summary
    pub summary_json: Option<PathBuf>,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("output.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            summary_json: None,
        }
    }
}

/// Process and transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Print DEBUG diagnostics to stderr
    #[serde(default)]
    pub debug: bool,
    /// Clock used for elapsed times
    #[serde(default)]
    pub clock: ClockKind,
    /// Connection attempts a worker makes before giving up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Pause between connection attempts (milliseconds)
    #[serde(default = "default_connect_interval_ms")]
    pub connect_interval_ms: u64,
}

fn default_connect_attempts() -> u32 {
    50
}

fn default_connect_interval_ms() -> u64 {
    100
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            clock: ClockKind::default(),
            connect_attempts: default_connect_attempts(),
            connect_interval_ms: default_connect_interval_ms(),
        }
    }
}

/// Whether a `PQUAD_DEBUG` value turns debugging on
pub fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if !v.is_empty() && v != "0")
}
