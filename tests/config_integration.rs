// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for configuration loading.
//!
//! Verifies defaults, explicit-file overrides, and the mapping from
//! configuration to the launch spec.

use anyhow::Result;
use forthls_client::config::Config;
use forthls_client::launch::{LaunchSpec, SERVER_COMMAND, TransportKind};

#[test]
fn defaults_point_at_forth_ls() {
    let config = Config::default();

    assert_eq!(config.command, SERVER_COMMAND);
    assert!(config.args.is_empty());
    assert_eq!(config.debounce_ms, 300);
    assert_eq!(config.launch_spec(), LaunchSpec::default());
}

#[test]
fn explicit_file_overrides_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");

    let raw = concat!(
        "command = \"custom_forth_ls\"\n",
        "args = [\"--log-level\", \"debug\"]\n",
        "debounce_ms = 50\n",
    );
    std::fs::write(&path, raw)?;

    let config = Config::load(Some(path))?;

    assert_eq!(config.command, "custom_forth_ls");
    assert_eq!(config.args, vec!["--log-level", "debug"]);
    assert_eq!(config.debounce_ms, 50);

    let spec = config.launch_spec();
    assert_eq!(spec.command, "custom_forth_ls");
    assert_eq!(spec.transport, TransportKind::Stdio);

    // The layered loader and plain serde agree on the same document.
    let direct: Config = toml::from_str(raw)?;
    assert_eq!(direct.command, config.command);
    assert_eq!(direct.args, config.args);
    assert_eq!(direct.debounce_ms, config.debounce_ms);
    Ok(())
}

#[test]
fn partial_file_keeps_remaining_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "debounce_ms = 25\n")?;

    let config = Config::load(Some(path))?;

    assert_eq!(config.command, SERVER_COMMAND);
    assert!(config.args.is_empty());
    assert_eq!(config.debounce_ms, 25);
    Ok(())
}
