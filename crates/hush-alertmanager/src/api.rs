//! The silence API contract.
//!
//! The reconciler only depends on the field-level contract captured by
//! [`SilenceApi`]; the wire format belongs to the implementations.

use std::sync::Arc;

use hush_types::{AlertmanagerSilence, PostableSilence};

use crate::error::Result;

/// Operations on the Alertmanager's live silence objects.
///
/// Implementations are shared across reconcile workers, so every method
/// takes `&self` and implementors must be `Send + Sync`.
pub trait SilenceApi: Send + Sync {
    /// Searches for silences matching all of the given filter strings.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error if the search cannot be executed.
    fn search(&self, filters: &[String]) -> Result<Vec<AlertmanagerSilence>>;

    /// Fetches a silence by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AlertmanagerError::NotFound` if no such silence exists.
    fn get(&self, id: &str) -> Result<AlertmanagerSilence>;

    /// Creates or replaces a silence and returns the resulting identifier.
    ///
    /// An absent payload id creates a new silence; a known id replaces the
    /// existing one.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error if the write fails.
    fn upsert(&self, silence: &PostableSilence) -> Result<String>;

    /// Deletes a silence by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AlertmanagerError::NotFound` if no such silence exists;
    /// callers treating deletion as idempotent should ignore that case.
    fn delete(&self, id: &str) -> Result<()>;
}

impl<T: SilenceApi + ?Sized> SilenceApi for Arc<T> {
    fn search(&self, filters: &[String]) -> Result<Vec<AlertmanagerSilence>> {
        (**self).search(filters)
    }

    fn get(&self, id: &str) -> Result<AlertmanagerSilence> {
        (**self).get(id)
    }

    fn upsert(&self, silence: &PostableSilence) -> Result<String> {
        (**self).upsert(silence)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }
}
