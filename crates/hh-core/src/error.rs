//! Error types for the hh drivers

use std::path::PathBuf;

use thiserror::Error;

/// hh driver error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Unsupported or unrecognised configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expected per-point result file is absent
    #[error("missing result file: {}", path.display())]
    MissingResult {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// Result file exists but cannot be parsed as a limit mapping
    #[error("malformed result file {}: {source}", path.display())]
    MalformedResult {
        /// Offending file.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },

    /// External command exited unsuccessfully
    #[error("command `{command}` failed with {status}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status description (`exit code 1`, `signal 9`, ...).
        status: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
