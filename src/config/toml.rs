//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the run configuration from the environment and the command line
///
/// `config_path` and `debug_var` are the values of `PQUAD_CONFIG` and
/// `PQUAD_DEBUG`.
pub fn load(cli: &Cli, config_path: Option<&Path>, debug_var: Option<&str>) -> Result<Config> {
    let config = match config_path {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    Ok(merge_cli_with_config(cli, config, debug_var))
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config, debug_var: Option<&str>) -> Config {
    if let Some(steps) = cli.steps {
        config.integration.default_steps = steps;
    }

    if debug_enabled(debug_var) {
        config.runtime.debug = true;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::ClockKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full() {
        let config = parse_toml_string(
            r#"
            [integration]
            lower = 1.0
            upper = 2.0
            integrand = "inverse"
            default_steps = 1000

            [aggregation]
            mode = "reduce"
            tag = 7
            remainder = "absorb-last"

            [output]
            log_path = "results.log"
            summary_json = "summary.json"

            [runtime]
            debug = true
            clock = "cpu"
            connect_attempts = 3
            connect_interval_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.integration.interval(), Interval::new(1.0, 2.0));
        assert_eq!(config.integration.integrand, Integrand::Inverse);
        assert_eq!(config.integration.default_steps, 1000);
        assert_eq!(config.aggregation.mode, AggregationMode::Reduce);
        assert_eq!(config.aggregation.tag, 7);
        assert_eq!(config.aggregation.remainder, RemainderPolicy::AbsorbLast);
        assert_eq!(config.output.log_path, PathBuf::from("results.log"));
        assert_eq!(config.output.summary_json, Some(PathBuf::from("summary.json")));
        assert!(config.runtime.debug);
        assert_eq!(config.runtime.clock, ClockKind::Cpu);
        assert_eq!(config.runtime.connect_attempts, 3);
        assert_eq!(config.runtime.connect_interval_ms, 10);
    }

    #[test]
    fn test_parse_partial_uses_defaults() {
        let config = parse_toml_string("[aggregation]\nmode = \"reduce\"\n").unwrap();

        assert_eq!(config.aggregation.mode, AggregationMode::Reduce);
        assert_eq!(config.aggregation.tag, 123);
        assert_eq!(config.integration, IntegrationConfig::default());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        assert!(parse_toml_string("[aggregation]\nmode = \"broadcast\"\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[integration]\ndefault_steps = 500").unwrap();

        let from_file = load(&Cli { steps: None }, Some(file.path()), None).unwrap();
        assert_eq!(from_file.integration.default_steps, 500);

        let overridden = load(&Cli { steps: Some(100) }, Some(file.path()), None).unwrap();
        assert_eq!(overridden.integration.default_steps, 100);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load(&Cli { steps: None }, Some(Path::new("/nonexistent/pquad.toml")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_debug_variable() {
        let config = load(&Cli { steps: None }, None, Some("1")).unwrap();
        assert!(config.runtime.debug);
    }
}
