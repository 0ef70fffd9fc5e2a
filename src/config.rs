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

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::launch::{self, LaunchSpec};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The language server command to execute (default: `forth_ls`)
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments to pass to the command (default: none)
    #[serde(default)]
    pub args: Vec<String>,

    /// Debounce window for filesystem events in milliseconds (default: 300)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_command() -> String {
    launch::SERVER_COMMAND.to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("command", launch::SERVER_COMMAND)?
            .set_default("debounce_ms", 300_i64)?;

        // 2. Load from user config directory (~/.config/forthls-client/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("forthls-client").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (FORTHLS_COMMAND, etc.)
        builder = builder.add_source(config::Environment::with_prefix("FORTHLS"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// The launch spec for the configured server command.
    #[must_use]
    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec {
            command: self.command.clone(),
            args: self.args.clone(),
            transport: crate::launch::TransportKind::Stdio,
        }
    }

    /// The filesystem-event debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
