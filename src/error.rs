use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the transix engine
///
/// Per-entity failures (`Resolution`, `Construction`, `Cleanup`) are
/// contained within the stage that produced them: they are logged and the
/// entity is left in its prior state for retry on the next cycle. Nothing
/// in this taxonomy is fatal to the process.
#[derive(Error, Debug)]
pub enum TransixError {
    /// Malformed exposure pattern; the pattern is skipped, the rest still apply
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// Type lookup failed; the entity stays untyped and is retried next cycle
    #[error("Cannot resolve type of {desc} {name}: {source}")]
    Resolution {
        desc: String,
        name: String,
        source: anyhow::Error,
    },

    /// Proxy construction failed; the entity stays without a proxy and is retried
    #[error("Cannot interface with {desc} {name}: {source}")]
    Construction {
        desc: String,
        name: String,
        source: anyhow::Error,
    },

    /// Proxy teardown failed; the entity is destroyed regardless
    #[error("Cleanup of {desc} {name} failed: {source}")]
    Cleanup {
        desc: String,
        name: String,
        source: anyhow::Error,
    },

    /// Entity key already present in the store (caller must check first)
    #[error("Entity already tracked under key {key:?}")]
    DuplicateEntity { key: String },

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for transix operations
pub type Result<T> = std::result::Result<T, TransixError>;
