//! Error types for the hushd daemon.

use thiserror::Error;

/// Errors that can occur while running the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A manifest file could not be loaded.
    #[error("invalid manifest '{path}': {reason}")]
    Manifest {
        /// Path of the offending manifest file.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;
