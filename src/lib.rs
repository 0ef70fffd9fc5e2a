// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Editor-side bootstrap for the Forth language server.
//!
//! This crate connects a host editor's document surface to the external
//! `forth_ls` process over stdio LSP. It owns launch configuration, the
//! protocol handshake, filesystem-watch forwarding, and start/stop
//! sequencing — all language intelligence lives in the server.

/// Low-level language client: process spawn, handshake, stop sequence.
pub mod client;
/// Configuration handling for the server command and watcher tuning.
pub mod config;
/// Launch specification and client options.
pub mod launch;
/// Client lifecycle state machine (`activate`/`deactivate`).
pub mod lifecycle;
/// JSON-RPC framing and message envelopes.
pub mod protocol;
/// Filesystem watcher that forwards Forth file events to the server.
pub mod watch;
