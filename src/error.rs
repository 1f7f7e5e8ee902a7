//! Error types with actionable diagnostics.
//!
//! Writers only swallow errors on the JSON save path. Everything else is
//! returned to the host trainer, which treats it as fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, WriterError>;

/// Errors raised while building or driving writers.
#[derive(Error, Debug)]
pub enum WriterError {
    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON file could not be read back or written.
    #[error("JSON error in {path}: {source}\n  → Fix or remove the file to start a fresh summary log")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file is missing or malformed.
    #[error("Invalid configuration in {path}:\n  {message}\n  → Check YAML syntax and field names")]
    Config { path: PathBuf, message: String },

    /// A scalar name pattern could not be compiled.
    #[error("Invalid scalar pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Model state could not be turned into JSON.
    #[error("Model state serialization failed: {source}\n  → Check the model's Serialize implementation")]
    State {
        #[source]
        source: serde_json::Error,
    },

    /// Image buffer does not match its declared dimensions.
    #[error("Image shape mismatch: expected {expected} bytes, got {actual}\n  → Images are laid out as [channels, height, width] with 1, 3 or 4 channels")]
    ImageShape { expected: usize, actual: usize },
}

impl WriterError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a JSON error bound to a file.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "W001",
            Self::Json { .. } => "W002",
            Self::Config { .. } => "W003",
            Self::Pattern { .. } => "W004",
            Self::ImageShape { .. } => "W005",
            Self::State { .. } => "W006",
        }
    }
}
