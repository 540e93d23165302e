//! pquad participant entry point

use anyhow::{Context, Result};
use pquad::config::{cli::Cli, Config, ENV_CONFIG, ENV_DEBUG};
use pquad::distributed::{GroupEnvironment, LocalTransport, TcpTransport};
use std::path::PathBuf;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
    let debug_var = std::env::var(ENV_DEBUG).ok();
    let config = pquad::config::toml::load(&cli, config_path.as_deref(), debug_var.as_deref())?;

    pquad::config::validator::validate_config(&config)
        .context("Configuration validation failed")?;

    let group = GroupEnvironment::from_env()
        .context("Failed to read process group environment")?;

    if config.runtime.debug {
        eprintln!("DEBUG: Participant {} (coordinator: {:?})", group.context, group.coordinator_addr);
        if let Some(ref path) = config_path {
            eprintln!("DEBUG: Configuration loaded from {}", path.display());
        }
    }

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(group, &config))
}

async fn run(group: GroupEnvironment, config: &Config) -> Result<()> {
    match group.coordinator_addr {
        Some(ref addr) if group.context.group_size() > 1 => {
            let mut transport = TcpTransport::join(group.context, addr, &config.runtime).await
                .with_context(|| format!("Participant {} failed to join the group at {}", group.context, addr))?;
            pquad::participant::run(&mut transport, config).await?;
        }
        _ => {
            let mut transport = LocalTransport::singleton();
            pquad::participant::run(&mut transport, config).await?;
        }
    }

    Ok(())
}
