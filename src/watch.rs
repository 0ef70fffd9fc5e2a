// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Filesystem watcher that forwards Forth file events to the server.
//!
//! A debounced recursive watcher runs on the workspace root; events are
//! filtered against the watched globs and forwarded as
//! `workspace/didChangeWatchedFiles` notifications.

use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use lsp_types::{FileChangeType, FileEvent, Uri};
use notify_debouncer_full::{
    DebounceEventResult, DebouncedEvent, Debouncer, FileIdMap, new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher},
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::LanguageClient;

/// Owns the debounced watcher and the forwarding task.
pub struct WorkspaceWatcher {
    debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl WorkspaceWatcher {
    /// Starts watching `root` recursively, forwarding events matching
    /// `globs` through `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if a glob is invalid or the watcher cannot be
    /// installed on `root`.
    pub fn start(
        root: &Path,
        globs: &[String],
        client: Arc<LanguageClient>,
        debounce: Duration,
    ) -> Result<Self> {
        let matcher = glob_matcher(root, globs)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            debounce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!("File watcher error: {}", e);
                    }
                }
            },
        )
        .context("Failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        debug!(root = %root.display(), ?globs, "Watching workspace");

        let forwarder = tokio::spawn(forward_events(rx, matcher, client));

        Ok(Self {
            debouncer,
            forwarder,
        })
    }

    /// Stops the watcher and the forwarding task.
    pub fn stop(self) {
        drop(self.debouncer);
        self.forwarder.abort();
    }
}

/// Builds a matcher for glob patterns relative to `root`.
fn glob_matcher(root: &Path, globs: &[String]) -> Result<Override> {
    let mut builder = OverrideBuilder::new(root);
    for glob in globs {
        builder
            .add(glob)
            .with_context(|| format!("Invalid watch glob: {glob}"))?;
    }
    builder.build().context("Failed to build watch glob set")
}

/// Drains debounced events, filters them, and notifies the server.
async fn forward_events(
    mut rx: mpsc::UnboundedReceiver<DebouncedEvent>,
    matcher: Override,
    client: Arc<LanguageClient>,
) {
    while let Some(event) = rx.recv().await {
        let Some(typ) = change_type(&event.kind) else {
            continue;
        };

        let mut changes = Vec::new();
        for path in &event.paths {
            if !matcher.matched(path, false).is_whitelist() {
                continue;
            }
            match format!("file://{}", path.display()).parse::<Uri>() {
                Ok(uri) => changes.push(FileEvent::new(uri, typ)),
                Err(e) => warn!("Skipping unrepresentable path {}: {}", path.display(), e),
            }
        }

        if changes.is_empty() {
            continue;
        }

        debug!(count = changes.len(), "Forwarding watched-file events");
        if let Err(e) = client.did_change_watched_files(changes).await {
            warn!("Failed to forward watched-file events: {}", e);
        }
    }
}

/// Maps a filesystem event kind to the protocol's change type.
fn change_type(kind: &EventKind) -> Option<FileChangeType> {
    match kind {
        EventKind::Create(_) => Some(FileChangeType::CREATED),
        EventKind::Modify(_) => Some(FileChangeType::CHANGED),
        EventKind::Remove(_) => Some(FileChangeType::DELETED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_debouncer_full::notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn matcher_selects_forth_files_only() -> Result<()> {
        let root = Path::new("/workspace");
        let matcher = glob_matcher(root, &["**/*.forth".to_string()])?;

        assert!(
            matcher
                .matched(Path::new("/workspace/words.forth"), false)
                .is_whitelist()
        );
        assert!(
            matcher
                .matched(Path::new("/workspace/src/deep/core.forth"), false)
                .is_whitelist()
        );
        assert!(
            !matcher
                .matched(Path::new("/workspace/readme.txt"), false)
                .is_whitelist()
        );
        Ok(())
    }

    #[test]
    fn matcher_rejects_invalid_globs() {
        let root = Path::new("/workspace");
        assert!(glob_matcher(root, &["a[".to_string()]).is_err());
    }

    #[test]
    fn change_types_map_to_protocol_values() {
        assert_eq!(
            change_type(&EventKind::Create(CreateKind::File)),
            Some(FileChangeType::CREATED)
        );
        assert_eq!(
            change_type(&EventKind::Modify(ModifyKind::Any)),
            Some(FileChangeType::CHANGED)
        );
        assert_eq!(
            change_type(&EventKind::Remove(RemoveKind::File)),
            Some(FileChangeType::DELETED)
        );
        assert_eq!(change_type(&EventKind::Any), None);
        assert_eq!(change_type(&EventKind::Other), None);
    }
}
