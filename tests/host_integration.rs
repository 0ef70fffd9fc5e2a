//! End-to-end test for the host binary.
//!
//! Runs `forthls-client` against the mock server, then stops it with
//! SIGINT the way an editor host would, and asserts the server saw the
//! full stop sequence.

#![cfg(unix)]

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Polls `path` until it contains `needle` or the timeout expires.
fn wait_for_line(path: &Path, needle: &str, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;
    loop {
        let log = std::fs::read_to_string(path).unwrap_or_default();
        if log.contains(needle) {
            return Ok(log);
        }
        if Instant::now() >= deadline {
            anyhow::bail!("timed out waiting for '{needle}'; log so far:\n{log}");
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

#[test]
fn host_binary_runs_and_stops_cleanly() -> Result<()> {
    let workspace = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    let events_file = out.path().join("events.log");
    let config_path = out.path().join("config.toml");

    std::fs::write(
        &config_path,
        format!(
            "command = \"{}\"\nargs = [\"--events-file\", \"{}\"]\ndebounce_ms = 50\n",
            env!("CARGO_BIN_EXE_mock_forth_ls"),
            events_file.display(),
        ),
    )?;

    let mut child = Command::new(env!("CARGO_BIN_EXE_forthls-client"))
        .arg("--config")
        .arg(&config_path)
        .arg("--root")
        .arg(workspace.path())
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .context("Failed to spawn forthls-client")?;

    // Activation is complete once the mock has seen `initialized`.
    wait_for_line(&events_file, "initialized", Duration::from_secs(10))?;

    // SIGINT, as the host would deliver on shutdown.
    let kill = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()?;
    assert!(kill.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            anyhow::bail!("host did not exit after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(100));
    };
    assert!(exit.success(), "host exited with {exit:?}");

    let log = std::fs::read_to_string(&events_file)?;
    assert!(
        log.contains("shutdown"),
        "expected shutdown in mock log:\n{log}"
    );
    assert!(log.contains("exit"), "expected exit in mock log:\n{log}");
    Ok(())
}
