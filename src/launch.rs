// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Launch specification and client options for the Forth language server.
//!
//! Construction here is pure: no I/O, no side effects, and it cannot fail.
//! The lifecycle manager builds these values fresh on every activation.

use lsp_types::DocumentFilter;

/// Executable name of the external language server.
pub const SERVER_COMMAND: &str = "forth_ls";

/// Language id the client claims ownership of.
pub const LANGUAGE_ID: &str = "forth";

/// Glob selecting Forth source files, both for the document selector and
/// the filesystem watcher.
pub const FORTH_GLOB: &str = "**/*.forth";

/// Protocol-level client id, surfaced in editor UI and logs.
pub const CLIENT_ID: &str = "forthls";

/// Human-readable client name, surfaced in editor UI and logs.
pub const CLIENT_NAME: &str = "Forth Language Server";

/// Inter-process channel kind used to exchange protocol messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Standard input/output streams of the spawned process.
    Stdio,
}

/// How the external server process is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// The command to execute.
    pub command: String,
    /// Arguments passed to the command. Empty for `forth_ls`.
    pub args: Vec<String>,
    /// The transport the process speaks on.
    pub transport: TransportKind,
}

impl LaunchSpec {
    /// Creates a stdio launch spec for `command` with no arguments.
    #[must_use]
    pub fn stdio(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            transport: TransportKind::Stdio,
        }
    }
}

impl Default for LaunchSpec {
    fn default() -> Self {
        Self::stdio(SERVER_COMMAND)
    }
}

/// Which documents the client claims and which paths it watches.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Documents qualify when scheme, language id and path pattern match.
    pub document_selector: Vec<DocumentFilter>,
    /// Globs whose create/change/delete events are forwarded to the server.
    pub watched_globs: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            document_selector: vec![DocumentFilter {
                language: Some(LANGUAGE_ID.to_string()),
                scheme: Some("file".to_string()),
                pattern: Some(FORTH_GLOB.to_string()),
            }],
            watched_globs: vec![FORTH_GLOB.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_spec_defaults_to_forth_ls_over_stdio() {
        let spec = LaunchSpec::default();
        assert_eq!(spec.command, "forth_ls");
        assert!(spec.args.is_empty());
        assert_eq!(spec.transport, TransportKind::Stdio);
    }

    #[test]
    fn client_options_select_forth_documents() {
        let options = ClientOptions::default();
        assert_eq!(options.document_selector.len(), 1);

        let filter = &options.document_selector[0];
        assert_eq!(filter.scheme.as_deref(), Some("file"));
        assert_eq!(filter.language.as_deref(), Some("forth"));
        assert_eq!(filter.pattern.as_deref(), Some("**/*.forth"));

        assert_eq!(options.watched_globs, vec!["**/*.forth".to_string()]);
    }

    #[test]
    fn construction_is_idempotent() {
        // Repeated activations must see identical configuration.
        assert_eq!(LaunchSpec::default(), LaunchSpec::default());
        assert_eq!(ClientOptions::default(), ClientOptions::default());
    }
}
