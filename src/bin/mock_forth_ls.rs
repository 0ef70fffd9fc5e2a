// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! A configurable mock `forth_ls` for integration testing.
//!
//! Speaks Content-Length framed JSON-RPC over stdin/stdout. CLI flags
//! control timing and failure modes; `--events-file` records received
//! traffic so tests can assert on it. No tokio — a single blocking loop.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde_json::{Value, json};

/// Mock Forth language server for integration testing.
#[derive(Parser, Debug)]
#[command(name = "mock_forth_ls")]
struct Args {
    /// Sleep before answering `shutdown` (milliseconds).
    #[arg(long, default_value_t = 0)]
    shutdown_delay: u64,

    /// Return `InternalError` for this method (repeatable).
    #[arg(long)]
    fail_on: Vec<String>,

    /// Send a `client/registerCapability` request after `initialized`.
    #[arg(long)]
    register_watchers: bool,

    /// Append each received method (and watched-file URIs) to this file.
    #[arg(long)]
    events_file: Option<PathBuf>,
}

/// Shared state for the mock server.
struct MockServer<W: Write> {
    args: Args,
    writer: W,
    next_request_id: u64,
}

impl<W: Write> MockServer<W> {
    fn new(args: Args, writer: W) -> Self {
        Self {
            args,
            writer,
            next_request_id: 0,
        }
    }

    /// Run the server, reading from the given reader.
    fn run(&mut self, reader: &mut dyn Read) {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }

            while let Some((message, consumed)) = split_frame(&buffer) {
                buffer.drain(..consumed);

                let Ok(value) = serde_json::from_str::<Value>(&message) else {
                    continue;
                };

                self.handle(&value);
            }
        }
    }

    fn handle(&mut self, message: &Value) {
        let Some(method) = message
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            // A response from the client (e.g. to registerCapability).
            if message.get("id").is_some() {
                self.record_lines(&["response".to_string()]);
            }
            return;
        };

        self.record(&method, message);

        if let Some(id) = message.get("id").cloned() {
            self.handle_request(&method, id);
        } else {
            self.handle_notification(&method);
        }
    }

    fn handle_request(&mut self, method: &str, id: Value) {
        if self.args.fail_on.iter().any(|m| m == method) {
            self.send(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32603,
                    "message": format!("mock_forth_ls: configured to fail on {method}")
                }
            }));
            return;
        }

        match method {
            "initialize" => self.send(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "capabilities": { "textDocumentSync": 1 },
                    "serverInfo": { "name": "mock forth_ls" }
                }
            })),
            "shutdown" => {
                if self.args.shutdown_delay > 0 {
                    std::thread::sleep(Duration::from_millis(self.args.shutdown_delay));
                }
                self.send(&json!({ "jsonrpc": "2.0", "id": id, "result": null }));
            }
            _ => self.send(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("mock_forth_ls: method not found: {method}")
                }
            })),
        }
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" if self.args.register_watchers => {
                self.next_request_id += 1;
                self.send(&json!({
                    "jsonrpc": "2.0",
                    "id": self.next_request_id,
                    "method": "client/registerCapability",
                    "params": {
                        "registrations": [{
                            "id": "workspace/didChangeWatchedFiles",
                            "method": "workspace/didChangeWatchedFiles",
                            "registerOptions": {
                                "watchers": [{ "globPattern": "**/*.forth" }]
                            }
                        }]
                    }
                }));
            }
            "exit" => std::process::exit(0),
            _ => {}
        }
    }

    /// Records the method, plus one detail line per watched-file change.
    fn record(&self, method: &str, message: &Value) {
        let mut lines = vec![method.to_string()];

        if method == "workspace/didChangeWatchedFiles"
            && let Some(changes) = message
                .get("params")
                .and_then(|p| p.get("changes"))
                .and_then(Value::as_array)
        {
            for change in changes {
                let uri = change.get("uri").and_then(Value::as_str).unwrap_or("?");
                let typ = change.get("type").and_then(Value::as_u64).unwrap_or(0);
                lines.push(format!("{method} {uri} {typ}"));
            }
        }

        self.record_lines(&lines);
    }

    fn record_lines(&self, lines: &[String]) {
        let Some(path) = &self.args.events_file else {
            return;
        };

        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            for line in lines {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn send(&mut self, value: &Value) {
        let Ok(body) = serde_json::to_string(value) else {
            return;
        };
        let _ = write!(self.writer, "Content-Length: {}\r\n\r\n{}", body.len(), body);
        let _ = self.writer.flush();
    }
}

/// Parse a Content-Length framed message from a buffer.
/// Returns the message string and the number of bytes consumed.
fn split_frame(buffer: &[u8]) -> Option<(String, usize)> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&buffer[..header_end]).ok()?;

    let mut content_length: Option<usize> = None;
    for line in headers.lines() {
        if line.to_ascii_lowercase().starts_with("content-length:") {
            content_length = line
                .split_once(':')
                .and_then(|(_, v)| v.trim().parse().ok());
        }
    }

    let content_length = content_length?;
    let total = header_end + 4 + content_length;

    if buffer.len() < total {
        return None;
    }

    let body = std::str::from_utf8(&buffer[header_end + 4..total]).ok()?;
    Some((body.to_string(), total))
}

fn main() {
    let args = Args::parse();
    let mut server = MockServer::new(args, std::io::stdout());
    let mut stdin = std::io::stdin().lock();
    server.run(&mut stdin);
}
