//! Error types for the hush-types crate.

use thiserror::Error;

/// Errors that can occur while validating silence resources.
#[derive(Debug, Error)]
pub enum SilenceError {
    /// A matcher in the silence spec is invalid.
    #[error("invalid matcher: {reason}")]
    InvalidMatcher {
        /// The reason the matcher is invalid.
        reason: String,
    },

    /// The silence resource itself is invalid.
    #[error("invalid silence: {reason}")]
    InvalidSilence {
        /// The reason the silence is invalid.
        reason: String,
    },
}

/// Result type for silence resource operations.
pub type Result<T> = std::result::Result<T, SilenceError>;
