//! In-memory silence API for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use hush_types::{AlertmanagerSilence, PostableSilence, filter_strings};

use crate::api::SilenceApi;
use crate::error::{AlertmanagerError, Result};

/// An in-memory [`SilenceApi`] implementation.
///
/// Behaves like a single Alertmanager: upserts assign identifiers, the
/// lifecycle state is derived from the time bounds on every read, and
/// deletes of unknown identifiers report not-found. Write counters and
/// failure injection make idempotence and compensation paths testable.
#[derive(Debug, Default)]
pub struct InMemorySilenceApi {
    silences: RwLock<HashMap<String, AlertmanagerSilence>>,
    upserts: AtomicU64,
    deletes: AtomicU64,
    fail_next_upsert: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl InMemorySilenceApi {
    /// Creates an empty in-memory API.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a silence, assigning an identifier if the given one is empty.
    pub fn insert(&self, mut silence: AlertmanagerSilence) -> String {
        if silence.id.is_empty() {
            silence.id = Uuid::new_v4().to_string();
        }
        let id = silence.id.clone();
        self.silences.write().insert(id.clone(), silence);
        id
    }

    /// Number of upsert calls that reached the backend.
    #[must_use]
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Number of delete calls that reached the backend.
    #[must_use]
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Number of silences currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.silences.read().len()
    }

    /// Returns true if no silences are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.silences.read().is_empty()
    }

    /// Makes the next upsert fail with a transport error.
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::Relaxed);
    }

    /// Makes the next delete fail with a transport error.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::Relaxed);
    }

    /// Forces a held silence's end time into the past, as the backend's
    /// own expiry transition would.
    pub fn expire(&self, id: &str) -> bool {
        let mut silences = self.silences.write();
        match silences.get_mut(id) {
            Some(silence) => {
                silence.ends_at = Utc::now() - chrono::Duration::seconds(1);
                true
            }
            None => false,
        }
    }

    fn with_current_state(silence: &AlertmanagerSilence) -> AlertmanagerSilence {
        let mut current = silence.clone();
        current.state =
            AlertmanagerSilence::state_at(current.starts_at, current.ends_at, Utc::now());
        current
    }
}

impl SilenceApi for InMemorySilenceApi {
    fn search(&self, filters: &[String]) -> Result<Vec<AlertmanagerSilence>> {
        let silences = self.silences.read();

        Ok(silences
            .values()
            .filter(|s| {
                let own = filter_strings(&s.matchers);
                filters.iter().all(|f| own.contains(f))
            })
            .map(Self::with_current_state)
            .collect())
    }

    fn get(&self, id: &str) -> Result<AlertmanagerSilence> {
        self.silences
            .read()
            .get(id)
            .map(Self::with_current_state)
            .ok_or_else(|| AlertmanagerError::NotFound { id: id.to_string() })
    }

    fn upsert(&self, silence: &PostableSilence) -> Result<String> {
        if self.fail_next_upsert.swap(false, Ordering::Relaxed) {
            return Err(AlertmanagerError::Transport {
                reason: "injected upsert failure".to_string(),
            });
        }

        self.upserts.fetch_add(1, Ordering::Relaxed);

        let id = silence
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let stored = AlertmanagerSilence {
            id: id.clone(),
            matchers: silence.matchers.clone(),
            comment: silence.comment.clone(),
            created_by: silence.created_by.clone(),
            starts_at: silence.starts_at,
            ends_at: silence.ends_at,
            state: AlertmanagerSilence::state_at(silence.starts_at, silence.ends_at, Utc::now()),
        };

        self.silences.write().insert(id.clone(), stored);
        Ok(id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.fail_next_delete.swap(false, Ordering::Relaxed) {
            return Err(AlertmanagerError::Transport {
                reason: "injected delete failure".to_string(),
            });
        }

        self.deletes.fetch_add(1, Ordering::Relaxed);

        match self.silences.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(AlertmanagerError::NotFound { id: id.to_string() }),
        }
    }
}
