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

//! Low-level client for the spawned language server process.
//!
//! Owns the child process and its stdio transport: framed JSON-RPC out over
//! stdin, a reader task routing responses and server-initiated traffic from
//! stdout. The lifecycle manager drives [`LanguageClient::spawn`],
//! [`LanguageClient::initialize`] and [`LanguageClient::stop`]; the
//! filesystem watcher forwards events through
//! [`LanguageClient::did_change_watched_files`].

use anyhow::{Context, Result, anyhow};
use bytes::BytesMut;
use lsp_types::{
    ClientCapabilities, ClientInfo, DidChangeWatchedFilesClientCapabilities,
    DidChangeWatchedFilesParams, FileEvent, InitializeParams, InitializeResult, InitializedParams,
    Uri, WorkspaceClientCapabilities, WorkspaceFolder,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, trace, warn};

use crate::launch::{LaunchSpec, TransportKind};
use crate::protocol::{
    self, NotificationMessage, RequestId, RequestMessage, ResponseError, ResponseMessage,
};

/// Default timeout for requests to the server.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the process to exit after `exit` before killing it.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ResponseMessage>>>>;

/// Manages communication with a language server process.
pub struct LanguageClient {
    id: String,
    name: String,
    next_id: AtomicI64,
    stdin: Arc<Mutex<ChildStdin>>,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
    child: Mutex<Child>,
    server_pid: Option<u32>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl LanguageClient {
    /// Spawns the server process per `spec` and starts the reader task.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its stdio
    /// streams cannot be captured.
    pub fn spawn(id: &str, name: &str, spec: &LaunchSpec) -> Result<Self> {
        let mut command = Command::new(&spec.command);
        command.args(&spec.args);
        match spec.transport {
            TransportKind::Stdio => {
                command
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
            }
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn language server: {}", spec.command))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Language server stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Language server stdout was not captured"))?;
        let server_pid = child.id();

        let stdin = Arc::new(Mutex::new(stdin));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let reader_handle = tokio::spawn(Self::reader_task(
            stdin.clone(),
            stdout,
            pending.clone(),
            alive.clone(),
        ));

        debug!(command = %spec.command, pid = ?server_pid, "Spawned language server");

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            next_id: AtomicI64::new(1),
            stdin,
            pending,
            alive,
            child: Mutex::new(child),
            server_pid,
            _reader_handle: reader_handle,
        })
    }

    /// Background task that reads server output and routes messages.
    async fn reader_task(
        stdin: Arc<Mutex<ChildStdin>>,
        mut stdout: tokio::process::ChildStdout,
        pending: PendingMap,
        alive: Arc<AtomicBool>,
    ) {
        let mut buffer = BytesMut::with_capacity(8192);
        let mut chunk = [0u8; 4096];

        'read: loop {
            match stdout.read(&mut chunk).await {
                Ok(0) => {
                    debug!("Language server closed stdout");
                    break;
                }
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    warn!("Error reading from language server: {}", e);
                    break;
                }
            }

            loop {
                match protocol::decode(&mut buffer) {
                    Ok(Some(raw)) => Self::dispatch(&raw, &stdin, &pending).await,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Malformed frame from language server: {}", e);
                        break 'read;
                    }
                }
            }
        }

        alive.store(false, Ordering::SeqCst);
        debug!("Reader task exiting - server connection closed");
    }

    /// Routes one decoded message: response, server request, or notification.
    async fn dispatch(raw: &str, stdin: &Arc<Mutex<ChildStdin>>, pending: &PendingMap) {
        trace!("Received message: {}", raw);

        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse server JSON: {}", e);
                return;
            }
        };

        let method = value
            .get("method")
            .and_then(|m| m.as_str())
            .map(str::to_owned);

        match (method, value.get("id").cloned()) {
            (Some(method), Some(id)) => {
                let id = serde_json::from_value(id).unwrap_or(RequestId::Number(0));
                Self::answer_server_request(&method, id, stdin).await;
            }
            (Some(_), None) => {
                if let Ok(notification) = serde_json::from_value::<NotificationMessage>(value) {
                    Self::handle_notification(&notification);
                }
            }
            (None, Some(_)) => {
                if let Ok(response) = serde_json::from_value::<ResponseMessage>(value)
                    && let Some(id) = response.id.clone()
                {
                    if let Some(sender) = pending.lock().await.remove(&id) {
                        let _ = sender.send(response);
                    } else {
                        warn!("Response for unknown request id: {:?}", id);
                    }
                }
            }
            (None, None) => warn!("Unrecognized message format: {}", raw),
        }
    }

    /// Answers a server-initiated request.
    ///
    /// The only request the client participates in is the watcher
    /// registration round-trip; everything else gets `MethodNotFound` so the
    /// server is never left blocking on us.
    async fn answer_server_request(method: &str, id: RequestId, stdin: &Arc<Mutex<ChildStdin>>) {
        let response = if method == "client/registerCapability" {
            debug!("Acknowledging capability registration");
            ResponseMessage {
                jsonrpc: protocol::JSONRPC_VERSION.to_string(),
                id: Some(id),
                result: Some(serde_json::Value::Null),
                error: None,
            }
        } else {
            debug!("Declining server request: {}", method);
            ResponseMessage {
                jsonrpc: protocol::JSONRPC_VERSION.to_string(),
                id: Some(id),
                result: None,
                error: Some(ResponseError {
                    code: -32601, // MethodNotFound
                    message: format!("Method '{method}' not supported by client"),
                    data: None,
                }),
            }
        };

        if let Err(e) = Self::write_message(stdin, &response).await {
            warn!("Failed to answer server request: {}", e);
        }
    }

    /// Handles server notifications. The bootstrap only surfaces log
    /// traffic; everything else belongs to the editor layer.
    fn handle_notification(notification: &NotificationMessage) {
        match notification.method.as_str() {
            "window/logMessage" | "window/showMessage" => {
                if let Some(message) = notification.params.get("message").and_then(|m| m.as_str()) {
                    debug!("Language server message: {}", message);
                }
            }
            _ => {
                trace!("Ignoring notification: {}", notification.method);
            }
        }
    }

    /// Sends a request and waits for the response with timeout.
    async fn request<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));

        let request = RequestMessage {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        Self::write_message(&self.stdin, &request).await?;

        let response = match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                // Channel closed - server died
                return Err(anyhow!("Language server closed the connection"));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(anyhow!(
                    "Request '{}' timed out after {:?}",
                    method,
                    REQUEST_TIMEOUT
                ));
            }
        };

        if let Some(error) = response.error {
            return Err(anyhow!(
                "Language server error {}: {}",
                error.code,
                error.message
            ));
        }

        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).context("Failed to parse language server response")
    }

    /// Sends a notification (no response expected).
    async fn notify<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        let notification = NotificationMessage {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };

        Self::write_message(&self.stdin, &notification).await
    }

    /// Writes one framed message to the server's stdin.
    async fn write_message<T: Serialize>(
        stdin: &Arc<Mutex<ChildStdin>>,
        message: &T,
    ) -> Result<()> {
        let framed = protocol::encode(message)?;
        let mut guard = stdin.lock().await;
        guard.write_all(&framed).await?;
        guard.flush().await?;
        Ok(())
    }

    /// Performs the `initialize`/`initialized` handshake.
    ///
    /// Advertises watched-file support and identifies the client by its
    /// human-readable name; the workspace folder is the activation root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be expressed as a URI, the
    /// request fails, or the server rejects initialization.
    pub async fn initialize(&self, root: &Path) -> Result<InitializeResult> {
        let root_uri: Uri = format!("file://{}", root.display())
            .parse()
            .map_err(|e| anyhow!("Invalid workspace root {:?}: {}", root, e))?;

        let params = InitializeParams {
            process_id: Some(std::process::id()),
            client_info: Some(ClientInfo {
                name: self.name.clone(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ClientCapabilities {
                workspace: Some(WorkspaceClientCapabilities {
                    did_change_watched_files: Some(DidChangeWatchedFilesClientCapabilities {
                        dynamic_registration: Some(true),
                        relative_pattern_support: Some(false),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: root
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "workspace".to_string()),
            }]),
            ..Default::default()
        };

        let result: InitializeResult = self.request("initialize", params).await?;

        if let Some(info) = &result.server_info {
            debug!(server = %info.name, "Language server initialized");
        }

        self.notify("initialized", InitializedParams {}).await?;

        Ok(result)
    }

    /// Forwards filesystem events to the server.
    pub async fn did_change_watched_files(&self, changes: Vec<FileEvent>) -> Result<()> {
        self.notify(
            "workspace/didChangeWatchedFiles",
            DidChangeWatchedFilesParams { changes },
        )
        .await
    }

    /// Runs the stop sequence: `shutdown` request, `exit` notification,
    /// then reap the process.
    ///
    /// Resolves only after the process has terminated. A server that
    /// ignores `exit` is killed after a grace period.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects `shutdown`, the notification
    /// cannot be written, or the process cannot be reaped.
    pub async fn stop(&self) -> Result<ExitStatus> {
        // shutdown response varies by server (null, true, etc.) - ignore result
        let _: serde_json::Value = self.request("shutdown", serde_json::Value::Null).await?;
        self.notify("exit", serde_json::Value::Null).await?;

        let mut child = self.child.lock().await;
        let status = match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
            Ok(status) => status.context("Failed to reap language server")?,
            Err(_) => {
                warn!("Language server did not exit after 'exit'; killing");
                child.start_kill().context("Failed to kill language server")?;
                child
                    .wait()
                    .await
                    .context("Failed to reap language server")?
            }
        };

        self.alive.store(false, Ordering::SeqCst);
        debug!(?status, "Language server stopped");
        Ok(status)
    }

    /// The protocol-level client id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The human-readable client name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS pid of the spawned server, if still known.
    #[must_use]
    pub const fn server_pid(&self) -> Option<u32> {
        self.server_pid
    }

    /// Returns true if the server connection is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
