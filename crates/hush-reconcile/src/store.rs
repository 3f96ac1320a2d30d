//! The desired-state store contract and its in-memory implementation.
//!
//! The store supplies declared [`Silence`] objects and persists metadata
//! and status back. Writes are optimistic: each object carries a
//! `resource_version` the store bumps on every persisted write, and a
//! write against a stale version surfaces as a retryable conflict instead
//! of silently overwriting a concurrent update.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use hush_types::{Silence, SilenceId, SilenceSpec};

/// Errors that can occur in the desired-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object with the given identity exists.
    #[error("silence not found: {id}")]
    NotFound {
        /// The identity that was not found.
        id: String,
    },

    /// The write lost an optimistic-concurrency race; reload and retry.
    #[error("write conflict on {id}")]
    Conflict {
        /// The identity the conflicting write targeted.
        id: String,
    },

    /// The store itself failed.
    #[error("store failure: {reason}")]
    Internal {
        /// The reason the store failed.
        reason: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Access to declared silences and their persisted metadata/status.
pub trait SilenceStore: Send + Sync {
    /// Fetches the current declared object, or `None` if it is fully gone.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if the store cannot be read.
    fn get(&self, id: &SilenceId) -> Result<Option<Silence>>;

    /// Persists the object's metadata (finalizers, deletion marker).
    ///
    /// When the deletion marker is set and the finalizer set is empty
    /// after this write, the store finalizes the object: it is removed
    /// and subsequent [`SilenceStore::get`] calls return `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` when the object's resource version
    /// is stale and `StoreError::NotFound` when the object is gone.
    fn update_meta(&self, obj: &Silence) -> Result<()>;

    /// Persists the object's status subresource, version-guarded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` when the object's resource version
    /// is stale and `StoreError::NotFound` when the object is gone.
    fn update_status(&self, obj: &Silence) -> Result<()>;
}

impl<T: SilenceStore + ?Sized> SilenceStore for Arc<T> {
    fn get(&self, id: &SilenceId) -> Result<Option<Silence>> {
        (**self).get(id)
    }

    fn update_meta(&self, obj: &Silence) -> Result<()> {
        (**self).update_meta(obj)
    }

    fn update_status(&self, obj: &Silence) -> Result<()> {
        (**self).update_status(obj)
    }
}

/// In-memory [`SilenceStore`] with user-side apply/delete operations.
///
/// `apply` and `mark_deleted` model the user (or a manifest pipeline)
/// editing declared objects: applying a changed spec bumps the generation,
/// and deletion is deferred while finalizers are present.
#[derive(Debug, Default)]
pub struct InMemorySilenceStore {
    objects: RwLock<HashMap<SilenceId, Silence>>,
    fail_next_status_update: AtomicBool,
}

impl InMemorySilenceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates a declared silence from user intent.
    ///
    /// A new object starts at generation 1; an existing object gets its
    /// generation bumped only when the spec actually changed. Objects
    /// already marked for deletion are left alone. Returns whether the
    /// declared state changed.
    pub fn apply(&self, id: SilenceId, spec: SilenceSpec) -> bool {
        let mut objects = self.objects.write();

        match objects.get_mut(&id) {
            Some(existing) => {
                if existing.is_deleting() || existing.spec == spec {
                    return false;
                }
                existing.spec = spec;
                existing.generation += 1;
                existing.resource_version += 1;
                debug!(silence = %id, generation = existing.generation, "spec updated");
                true
            }
            None => {
                let mut obj = Silence::new(id.clone(), spec);
                obj.resource_version = 1;
                objects.insert(id.clone(), obj);
                debug!(silence = %id, "silence declared");
                true
            }
        }
    }

    /// Sets the deletion marker on an object.
    ///
    /// An object without finalizers is removed immediately; otherwise it
    /// persists until the finalizers are removed via
    /// [`SilenceStore::update_meta`]. Returns whether the object existed.
    pub fn mark_deleted(&self, id: &SilenceId) -> bool {
        let mut objects = self.objects.write();

        let Some(obj) = objects.get_mut(id) else {
            return false;
        };

        if obj.is_deleting() {
            return true;
        }

        obj.deleted_at = Some(Utc::now());
        obj.resource_version += 1;

        if obj.finalizers.is_empty() {
            objects.remove(id);
            debug!(silence = %id, "silence removed without finalization");
        } else {
            debug!(silence = %id, "silence marked for deletion");
        }

        true
    }

    /// Identities of all objects currently held, terminating ones included.
    #[must_use]
    pub fn ids(&self) -> Vec<SilenceId> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of objects currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Makes the next status update fail with an internal error.
    pub fn fail_next_status_update(&self) {
        self.fail_next_status_update.store(true, Ordering::Relaxed);
    }
}

impl SilenceStore for InMemorySilenceStore {
    fn get(&self, id: &SilenceId) -> Result<Option<Silence>> {
        Ok(self.objects.read().get(id).cloned())
    }

    fn update_meta(&self, obj: &Silence) -> Result<()> {
        let mut objects = self.objects.write();

        let stored = objects
            .get_mut(&obj.id)
            .ok_or_else(|| StoreError::NotFound {
                id: obj.id.to_string(),
            })?;

        if stored.resource_version != obj.resource_version {
            return Err(StoreError::Conflict {
                id: obj.id.to_string(),
            });
        }

        stored.finalizers = obj.finalizers.clone();
        stored.deleted_at = obj.deleted_at;
        stored.resource_version += 1;

        if stored.is_deleting() && stored.finalizers.is_empty() {
            let id = obj.id.clone();
            objects.remove(&id);
            debug!(silence = %id, "silence finalized and removed");
        }

        Ok(())
    }

    fn update_status(&self, obj: &Silence) -> Result<()> {
        if self.fail_next_status_update.swap(false, Ordering::Relaxed) {
            return Err(StoreError::Internal {
                reason: "injected status write failure".to_string(),
            });
        }

        let mut objects = self.objects.write();

        let stored = objects
            .get_mut(&obj.id)
            .ok_or_else(|| StoreError::NotFound {
                id: obj.id.to_string(),
            })?;

        if stored.resource_version != obj.resource_version {
            return Err(StoreError::Conflict {
                id: obj.id.to_string(),
            });
        }

        stored.status = obj.status.clone();
        stored.resource_version += 1;

        Ok(())
    }
}
