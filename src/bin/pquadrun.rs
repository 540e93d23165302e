//! pquadrun - start a pquad group on this machine
//!
//! Spawns one participant process per rank with the group environment set,
//! waits for all of them and exits non-zero if any participant failed. When one
//! participant fails the rest are killed, since the survivors would otherwise
//! wait forever on a peer that will never send.

use anyhow::{Context, Result};
use pquad::config::{cli::LauncherCli, ENV_DEBUG};
use pquad::distributed::group::{ENV_COORDINATOR, ENV_RANK, ENV_SIZE};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let cli = LauncherCli::parse_args();
    let group_size = cli.group_size();

    let port = if cli.port == 0 {
        find_available_port(cli.debug)?
    } else {
        cli.port
    };
    let coordinator = format!("127.0.0.1:{}", port);
    let program = participant_program(&cli)?;

    if cli.debug {
        eprintln!("DEBUG: Launching {} x {} (coordinator {})", group_size, program.display(), coordinator);
    }

    let mut children = Vec::with_capacity(group_size);
    for rank in 0..group_size {
        match launch_participant(&program, rank, group_size, &coordinator, &cli) {
            Ok(child) => children.push(child),
            Err(e) => {
                kill_all(&mut children, cli.debug);
                return Err(e);
            }
        }
    }

    let failures = wait_all(&mut children, cli.debug)?;
    if failures > 0 {
        anyhow::bail!("{} of {} participants failed", failures, group_size);
    }

    Ok(())
}

/// First free localhost port from 9999 upwards
fn find_available_port(debug: bool) -> Result<u16> {
    use std::net::TcpListener;

    for port in 9999..10100 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            drop(listener);
            if debug {
                eprintln!("DEBUG: Port {} is available", port);
            }
            return Ok(port);
        }
    }

    anyhow::bail!("No available ports found in range 9999-10099. Close other pquad groups or pass --port.")
}

/// The participant executable: `--program`, or `pquad` next to this launcher
fn participant_program(cli: &LauncherCli) -> Result<PathBuf> {
    if let Some(ref program) = cli.program {
        return Ok(program.clone());
    }

    let exe_path = std::env::current_exe()
        .context("Failed to get current executable path")?;
    Ok(sibling_program(&exe_path))
}

fn sibling_program(exe_path: &Path) -> PathBuf {
    let name = format!("pquad{}", std::env::consts::EXE_SUFFIX);
    match exe_path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Start participant `rank`; stdio is inherited so every participant prints to
/// the launcher's terminal
fn launch_participant(
    program: &Path,
    rank: usize,
    group_size: usize,
    coordinator: &str,
    cli: &LauncherCli,
) -> Result<Child> {
    let mut cmd = Command::new(program);
    cmd.args(&cli.args);
    cmd.env(ENV_RANK, rank.to_string());
    cmd.env(ENV_SIZE, group_size.to_string());
    cmd.env(ENV_COORDINATOR, coordinator);

    if cli.debug {
        cmd.env(ENV_DEBUG, "1");
    }

    let child = cmd.spawn()
        .with_context(|| format!("Failed to spawn participant {} ({})", rank, program.display()))?;

    if cli.debug {
        eprintln!("DEBUG: Participant {} launched (PID: {})", rank, child.id());
    }

    Ok(child)
}

/// Wait for every participant, killing the rest after the first failure
///
/// Returns the number of participants that did not exit successfully.
fn wait_all(children: &mut [Child], debug: bool) -> Result<usize> {
    let mut statuses: Vec<Option<ExitStatus>> = vec![None; children.len()];
    let mut failures = 0;

    while statuses.iter().any(Option::is_none) {
        for (rank, child) in children.iter_mut().enumerate() {
            if statuses[rank].is_some() {
                continue;
            }

            if let Some(status) = child.try_wait()? {
                if debug {
                    eprintln!("DEBUG: Participant {} exited with status: {}", rank, status);
                }
                statuses[rank] = Some(status);

                if !status.success() {
                    failures += 1;
                    eprintln!("Error: participant {} exited with status: {}", rank, status);
                }
            }
        }

        if failures > 0 {
            for (rank, child) in children.iter_mut().enumerate() {
                if statuses[rank].is_none() {
                    if debug {
                        eprintln!("DEBUG: Killing participant {} (PID: {})", rank, child.id());
                    }
                    let _ = child.kill();
                    let status = child.wait()?;
                    statuses[rank] = Some(status);
                    failures += 1;
                }
            }
            break;
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(failures)
}

fn kill_all(children: &mut [Child], debug: bool) {
    for child in children.iter_mut() {
        if debug {
            eprintln!("DEBUG: Killing participant (PID: {})", child.id());
        }
        let _ = child.kill();
        let _ = child.wait();
    }
}
