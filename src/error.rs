//! Error types for hls-dl
//!
//! Only construction-time and submission-time problems surface as errors to
//! callers of [`Downloader`](crate::Downloader). Failures of the external tool
//! are observed through logs, events and [`TaskHandle`](crate::TaskHandle)s.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hls-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hls-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// A required directory could not be created
    #[error("failed to create directory '{}': {source}", path.display())]
    Filesystem {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output filename is not a plain file basename
    #[error("invalid output filename: {0:?}")]
    InvalidFilename(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// External tool execution failed (ffmpeg missing, spawn failure)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// A task was dropped before it reported a result
    #[error("task was abandoned before completion")]
    TaskAbandoned,

    /// Draining was cut short by a termination signal
    #[error("interrupted while waiting for downloads to finish")]
    Interrupted,
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
