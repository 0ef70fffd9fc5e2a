// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Host entry point for the Forth language client.
//!
//! Activates the client once at startup (spawn `forth_ls`, handshake, wire
//! the workspace watcher), then waits for Ctrl+C and deactivates. Logging
//! goes to stderr; stdout stays free in case a host ever wants to drive
//! this process over its own stdio.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forthls_client::config::Config;
use forthls_client::lifecycle::{ActivationContext, ClientLifecycle};

/// Command-line arguments for the host binary.
#[derive(Parser, Debug)]
#[command(name = "forthls-client")]
#[command(about = "Connects Forth documents to the forth_ls language server over stdio")]
#[command(version = env!("FORTHLS_CLIENT_VERSION"))]
struct Args {
    /// Workspace root directory (defaults to the current directory).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the language server command.
    #[arg(long)]
    server_command: Option<String>,
}

/// Entry point for the forthls-client binary.
///
/// # Errors
///
/// Returns an error if activation or the stop sequence fails.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("forthls_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config)?;
    if let Some(command) = args.server_command {
        config.command = command;
    }

    let root = args.root.unwrap_or_else(|| PathBuf::from("."));
    let root = root
        .canonicalize()
        .with_context(|| format!("Invalid workspace root: {}", root.display()))?;

    info!("Workspace root: {}", root.display());

    let ctx = ActivationContext { root };
    let mut lifecycle = ClientLifecycle::new(config);

    lifecycle.activate(&ctx).await?;
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    lifecycle.deactivate().await?;
    Ok(())
}
