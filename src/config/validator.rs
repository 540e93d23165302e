//! Configuration validation

use super::*;
use crate::distributed::protocol::BARRIER_TAG;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_integration(&config.integration)?;
    validate_aggregation(&config.aggregation)?;
    validate_output(&config.output)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Validate integration settings
pub fn validate_integration(integration: &IntegrationConfig) -> Result<()> {
    if !integration.lower.is_finite() || !integration.upper.is_finite() {
        anyhow::bail!(
            "Integration limits must be finite, got [{}, {}]",
            integration.lower,
            integration.upper
        );
    }

    if integration.lower >= integration.upper {
        anyhow::bail!(
            "lower ({}) must be less than upper ({})",
            integration.lower,
            integration.upper
        );
    }

    if integration.default_steps == 0 {
        anyhow::bail!("Step count must be at least 1");
    }

    Ok(())
}

/// Validate aggregation settings
pub fn validate_aggregation(aggregation: &AggregationConfig) -> Result<()> {
    if aggregation.tag == BARRIER_TAG {
        anyhow::bail!("Tag {} is reserved for the shutdown barrier", BARRIER_TAG);
    }

    Ok(())
}

/// Validate output settings
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.log_path.as_os_str().is_empty() {
        anyhow::bail!("log_path must not be empty");
    }

    if let Some(ref summary) = output.summary_json {
        if summary.as_os_str().is_empty() {
            anyhow::bail!("summary_json must not be empty when set");
        }
        if *summary == output.log_path {
            anyhow::bail!("summary_json and log_path must be different files");
        }
    }

    Ok(())
}

/// Validate runtime settings
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if runtime.connect_attempts == 0 {
        anyhow::bail!("connect_attempts must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_limits() {
        let mut integration = IntegrationConfig::default();
        integration.lower = 2.0;
        integration.upper = 1.0;
        assert!(validate_integration(&integration).is_err());

        integration.upper = 2.0;
        assert!(validate_integration(&integration).is_err());

        integration.upper = f64::INFINITY;
        assert!(validate_integration(&integration).is_err());

        integration.lower = f64::NAN;
        integration.upper = 1.0;
        assert!(validate_integration(&integration).is_err());
    }

    #[test]
    fn test_zero_steps() {
        let mut integration = IntegrationConfig::default();
        integration.default_steps = 0;
        assert!(validate_integration(&integration).is_err());
    }

    #[test]
    fn test_reserved_tag() {
        let mut aggregation = AggregationConfig::default();
        aggregation.tag = BARRIER_TAG;
        assert!(validate_aggregation(&aggregation).is_err());
    }

    #[test]
    fn test_summary_cannot_overwrite_log() {
        let output = OutputConfig {
            log_path: PathBuf::from("output.txt"),
            summary_json: Some(PathBuf::from("output.txt")),
        };
        assert!(validate_output(&output).is_err());
    }

    #[test]
    fn test_connect_attempts() {
        let mut runtime = RuntimeConfig::default();
        runtime.connect_attempts = 0;
        assert!(validate_runtime(&runtime).is_err());
    }
}
