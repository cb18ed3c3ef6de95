//! Exposure configuration
//!
//! Declares the reconcile cadence and the per-kind pattern lists. Loading
//! only parses; `validate` is a separate pass so callers can decide whether
//! a questionable file is worth refusing (the engine itself treats a
//! malformed pattern as warn-and-skip, never fatal).

use crate::error::{Result, TransixError, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub expose: ExposeConfig,
}

/// Cadence of the scheduler loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Milliseconds between reconciliation cycles
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// Per-kind exposure pattern lists; an empty list exposes nothing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExposeConfig {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub params: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TransixError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| TransixError::Io {
            source: e,
            context: format!("Failed to read config: {:?}", path),
        })?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|e| TransixError::Io {
            source: e,
            context: format!("Failed to write config: {:?}", path),
        })
    }

    /// Check cadence and pattern syntax, collecting every failure.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.reconcile.interval_ms == 0 {
            errors.push(ValidationError::new(
                "reconcile.interval_ms",
                "must be greater than zero",
            ));
        }

        let kinds = [
            ("expose.services", &self.expose.services),
            ("expose.topics", &self.expose.topics),
            ("expose.params", &self.expose.params),
        ];
        for (key, patterns) in kinds {
            for (i, pattern) in patterns.iter().enumerate() {
                if let Err(e) = regex::Regex::new(pattern) {
                    errors.push(ValidationError::new(
                        format!("{key}[{i}]"),
                        format!("invalid pattern {pattern:?}: {e}"),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TransixError::ConfigValidation { errors })
        }
    }

    /// Scheduler cadence as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.reconcile.interval_ms)
    }
}
