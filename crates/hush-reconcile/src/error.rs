//! Error types for the hush-reconcile crate.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by a single reconciliation attempt.
///
/// Every variant is retryable: the caller schedules a bounded-backoff
/// retry, and no reconcile failure is fatal to the process.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A desired-state store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An Alertmanager call failed.
    #[error("alertmanager error: {0}")]
    Backend(#[from] hush_alertmanager::AlertmanagerError),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
