// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Engine configuration
//!
//! Loaded from `opchain.toml` in the working directory, else from the
//! user config directory (`~/.config/opchain/opchain.toml` on Linux).
//! Every key is optional:
//!
//! ```toml
//! [suggestions]
//! cutoff = 0.6
//! limit = 3
//!
//! [http]
//! default_timeout_secs = 30
//! user_agent = "opchain/0.1"
//!
//! [log]
//! filter = "opchain=info"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::errors::{OpchainError, OpchainResult};
use crate::registry::SuggestionConfig;

pub const CONFIG_FILE_NAME: &str = "opchain.toml";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub suggestions: SuggestionConfig,
    pub http: HttpDefaults,
    pub log: LogConfig,
}

/// Defaults for the `http_request` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDefaults {
    /// Timeout used when a step sets none
    pub default_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            user_agent: format!("opchain/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Log output settings for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "opchain=info".into(),
        }
    }
}

impl EngineConfig {
    /// Load from the first config file found, or defaults
    pub fn load(working_dir: &Path) -> OpchainResult<Self> {
        let local = working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load_from(&local);
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> OpchainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OpchainError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let config: Self = toml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Path of the per-user config file
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "opchain").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn check(&self) -> OpchainResult<()> {
        if !(0.0..=1.0).contains(&self.suggestions.cutoff) {
            return Err(OpchainError::InvalidInput {
                message: format!(
                    "suggestions.cutoff must be between 0 and 1, got {}",
                    self.suggestions.cutoff
                ),
            });
        }
        if self.http.default_timeout_secs == 0 {
            return Err(OpchainError::InvalidInput {
                message: "http.default_timeout_secs must be at least 1".into(),
            });
        }
        Ok(())
    }
}
