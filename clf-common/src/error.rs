//! Common error types for the review pipeline

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the review tools
///
/// Every variant is fatal to the run that raised it. Detector failures
/// never reach this type: the analyzer contains them per image.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error outside of manifest line parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object storage read/write/list failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Labeling-job service submit/describe failure
    #[error("Job service error: {0}")]
    JobService(String),

    /// Unparseable line in a newline-delimited JSON stream
    #[error("Malformed record in {stream} at line {line}: {reason}")]
    MalformedRecord {
        /// Stream the line came from (e.g. "label-verification")
        stream: String,
        /// 1-based line number within the stream
        line: usize,
        /// Parser message
        reason: String,
    },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
