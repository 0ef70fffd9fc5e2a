/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Client lifecycle: single authority over the client handle.
//!
//! [`ClientLifecycle`] owns at most one [`LanguageClient`] and its
//! workspace watcher, and sequences them through
//! `Uninitialized → Starting → Running → Stopping → Stopped`. `activate`
//! is valid exactly once; `deactivate` is a no-op when nothing was ever
//! started. Transitions outside the state machine are typed errors rather
//! than silent ignores.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::LanguageClient;
use crate::config::Config;
use crate::launch::{CLIENT_ID, CLIENT_NAME, ClientOptions};
use crate::watch::WorkspaceWatcher;

/// Where the lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No client has been created yet.
    Uninitialized,
    /// `activate` is in flight.
    Starting,
    /// The client and server are up.
    Running,
    /// `deactivate` is in flight.
    Stopping,
    /// The client was stopped, or activation failed. Terminal.
    Stopped,
}

/// Invalid lifecycle transitions. These are programming errors in the
/// host, not runtime failures.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// `activate` was called when a client already exists or existed.
    #[error("activate called in state {0:?}; the client may only be started once")]
    AlreadyActivated(LifecycleState),
    /// `deactivate` was called while a transition was in flight.
    #[error("deactivate called during an in-flight transition (state {0:?})")]
    TransitionInFlight(LifecycleState),
}

/// What `deactivate` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A running client was stopped and its process has terminated.
    Stopped,
    /// No client was ever running; nothing was done.
    NeverStarted,
}

/// Host-provided context for activation.
#[derive(Debug, Clone)]
pub struct ActivationContext {
    /// Workspace root: becomes the server's workspace folder and the
    /// watcher root.
    pub root: PathBuf,
}

/// Owns the single client handle and enforces the state machine.
pub struct ClientLifecycle {
    config: Config,
    state: LifecycleState,
    client: Option<Arc<LanguageClient>>,
    watcher: Option<WorkspaceWatcher>,
}

impl ClientLifecycle {
    /// Creates an uninitialized lifecycle.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            state: LifecycleState::Uninitialized,
            client: None,
            watcher: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The live client, if one exists.
    #[must_use]
    pub fn client(&self) -> Option<&LanguageClient> {
        self.client.as_deref()
    }

    /// Builds the launch configuration, spawns the client, and starts it.
    ///
    /// On success the server process is running, the handshake is done,
    /// and the workspace watcher is forwarding file events. On failure the
    /// handle is absent and the lifecycle is parked in `Stopped`: a later
    /// `deactivate` is a no-op, and a later `activate` is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyActivated`] when called in any
    /// state other than `Uninitialized`, or the underlying spawn/handshake
    /// failure from the client.
    pub async fn activate(&mut self, ctx: &ActivationContext) -> Result<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::AlreadyActivated(self.state).into());
        }
        self.state = LifecycleState::Starting;

        match self.start(ctx).await {
            Ok(()) => {
                self.state = LifecycleState::Running;
                info!("Language client running");
                Ok(())
            }
            Err(e) => {
                self.state = LifecycleState::Stopped;
                self.watcher = None;
                self.client = None;
                Err(e)
            }
        }
    }

    async fn start(&mut self, ctx: &ActivationContext) -> Result<()> {
        let spec = self.config.launch_spec();
        let options = ClientOptions::default();

        info!(command = %spec.command, "Starting language client");

        let client = Arc::new(LanguageClient::spawn(CLIENT_ID, CLIENT_NAME, &spec)?);
        client
            .initialize(&ctx.root)
            .await
            .context("Language server initialization failed")?;

        let watcher = WorkspaceWatcher::start(
            &ctx.root,
            &options.watched_globs,
            client.clone(),
            self.config.debounce(),
        )?;

        self.client = Some(client);
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Stops the client if one is running.
    ///
    /// Resolves only after the server's stop sequence finishes (shutdown
    /// acknowledged, process terminated). When no client was ever created
    /// this is a no-op and returns [`StopOutcome::NeverStarted`]
    /// immediately, without any process or protocol interaction.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TransitionInFlight`] when called during
    /// `Starting`/`Stopping`, or the stop-sequence failure from the
    /// client. Even on failure the lifecycle ends in `Stopped`.
    pub async fn deactivate(&mut self) -> Result<StopOutcome> {
        match self.state {
            LifecycleState::Uninitialized | LifecycleState::Stopped => {
                debug!("Deactivate with no client; nothing to stop");
                Ok(StopOutcome::NeverStarted)
            }
            LifecycleState::Starting | LifecycleState::Stopping => {
                Err(LifecycleError::TransitionInFlight(self.state).into())
            }
            LifecycleState::Running => {
                self.state = LifecycleState::Stopping;

                if let Some(watcher) = self.watcher.take() {
                    watcher.stop();
                }

                let Some(client) = self.client.take() else {
                    self.state = LifecycleState::Stopped;
                    return Ok(StopOutcome::NeverStarted);
                };

                info!("Stopping language client");
                let result = client.stop().await;
                self.state = LifecycleState::Stopped;

                match result {
                    Ok(status) => {
                        info!(?status, "Language client stopped");
                        Ok(StopOutcome::Stopped)
                    }
                    Err(e) => Err(e).context("Language server stop sequence failed"),
                }
            }
        }
    }
}
