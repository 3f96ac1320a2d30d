//! Error types for the hush-alertmanager crate.

use thiserror::Error;

/// Errors that can occur while talking to the Alertmanager.
#[derive(Debug, Error)]
pub enum AlertmanagerError {
    /// No silence with the given identifier exists.
    #[error("silence not found: {id}")]
    NotFound {
        /// The silence identifier that was not found.
        id: String,
    },

    /// The request could not be delivered (connection, timeout, TLS).
    #[error("transport error: {reason}")]
    Transport {
        /// The reason the request failed.
        reason: String,
    },

    /// The Alertmanager answered with a non-success status.
    #[error("alertmanager returned status {status}: {reason}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Response body or status text.
        reason: String,
    },

    /// A payload or response could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AlertmanagerError {
    /// Returns true for the benign not-found condition, which drives a
    /// state transition rather than a retry.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for AlertmanagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for Alertmanager operations.
pub type Result<T> = std::result::Result<T, AlertmanagerError>;
