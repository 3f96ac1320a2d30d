//! The per-silence reconciliation state machine.
//!
//! Each trigger moves one declared [`Silence`] closer to its desired
//! backend state: create the Alertmanager silence, extend it before it can
//! lapse, re-sync it after a spec edit, adopt it after a lost identifier,
//! or tear it down when the object is deleted. Triggers arrive
//! at-least-once and possibly duplicated; every step is idempotent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use hush_alertmanager::SilenceApi;
use hush_types::{PostableSilence, Silence, SilenceId, SILENCE_FINALIZER};

use crate::error::Result;
use crate::store::SilenceStore;

/// Tuning knobs for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Interval between steady-state reconciliations, in seconds.
    pub interval_secs: u64,
    /// Lifetime of each created/extended silence, in seconds.
    pub silence_duration_secs: u64,
    /// Creator string recorded on every backend silence.
    pub author: String,
    /// Instance name appended to every silence comment, identifying which
    /// operator instance owns the silence.
    pub instance: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            silence_duration_secs: 3600,
            author: "hushd".to_string(),
            instance: "hushd".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// The steady-state requeue interval.
    #[must_use]
    pub const fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The point before which a backend silence must be extended: if fewer
    /// than three reconcile intervals remain until its end time, it is
    /// rewritten now. This bounds backend writes to roughly one per several
    /// intervals while guaranteeing extension even if a cycle or two are
    /// missed.
    #[must_use]
    pub fn extension_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(3 * self.interval_secs as i64)
    }
}

/// What the caller should do after a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing further to do for this object.
    Done,
    /// Re-trigger immediately; metadata changed and the next state needs a
    /// fresh read.
    Requeue,
    /// Re-trigger after the given delay.
    RequeueAfter(Duration),
}

/// Reconciles declared silences against an Alertmanager.
///
/// Generic over the desired-state store and the backend API so the state
/// machine is testable without either collaborator's wire plumbing. One
/// reconciler is shared by all workers; triggers for the same object must
/// be serialized by the delivery mechanism, triggers for distinct objects
/// may run concurrently.
#[derive(Debug)]
pub struct SilenceReconciler<S: SilenceStore, A: SilenceApi> {
    store: S,
    backend: A,
    config: ReconcilerConfig,
}

impl<S: SilenceStore, A: SilenceApi> SilenceReconciler<S, A> {
    /// Creates a reconciler over the given collaborators.
    pub fn new(store: S, backend: A, config: ReconcilerConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Returns the reconciler's configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Runs one reconciliation attempt for the given object.
    ///
    /// # Errors
    ///
    /// Every error is retryable; the caller requeues after a bounded delay.
    pub fn reconcile(&self, id: &SilenceId) -> Result<ReconcileOutcome> {
        self.reconcile_at(id, Utc::now())
    }

    /// Runs one reconciliation attempt with an explicit clock.
    ///
    /// # Errors
    ///
    /// Every error is retryable; the caller requeues after a bounded delay.
    pub fn reconcile_at(&self, id: &SilenceId, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let Some(mut obj) = self.store.get(id)? else {
            // Already finalized and removed; nothing left to own.
            debug!(silence = %id, "declared silence is gone, nothing to reconcile");
            return Ok(ReconcileOutcome::Done);
        };

        if obj.is_deleting() {
            return self.finalize(&mut obj);
        }

        // Record cleanup responsibility durably before any backend side
        // effect exists, then re-read: the object can never be garbage
        // collected while still owning a live silence.
        if obj.add_finalizer(SILENCE_FINALIZER) {
            self.store.update_meta(&obj)?;
            info!(silence = %obj.id, "added finalizer");
            return Ok(ReconcileOutcome::Requeue);
        }

        if obj.spec.suspend {
            info!(silence = %obj.id, "reconciliation is suspended");
            return Ok(ReconcileOutcome::Done);
        }

        // The identifier as persisted before this cycle; a changed result
        // from the upsert below means status must be rewritten.
        let recorded_id = obj.status.alertmanager_id.clone();
        let mut starts_at = None;

        if let Some(am_id) = recorded_id.clone() {
            match self.backend.get(&am_id) {
                Err(err) => {
                    // Missing or unreadable: drop the identifier so the
                    // silence is recreated (or re-adopted) below.
                    info!(silence = %obj.id, id = %am_id, error = %err,
                        "recorded alertmanager silence unavailable");
                    obj.status.alertmanager_id = None;
                }
                Ok(existing) => {
                    starts_at = Some(existing.starts_at);

                    if existing.state.is_expired() {
                        info!(silence = %obj.id, id = %am_id, "alertmanager silence expired, rewriting");
                    } else if obj.generation != obj.status.last_applied_generation {
                        info!(silence = %obj.id, id = %am_id, "spec changed, updating alertmanager silence");
                    } else if existing.ends_at > self.config.extension_deadline(now) {
                        debug!(silence = %obj.id, id = %am_id, ends_at = %existing.ends_at,
                            "silence end is far enough out, no write needed");
                        return Ok(ReconcileOutcome::RequeueAfter(self.config.requeue_interval()));
                    } else {
                        info!(silence = %obj.id, id = %am_id, "extending alertmanager silence");
                    }
                }
            }
        }

        if obj.status.alertmanager_id.is_none() {
            self.adopt_existing(&mut obj)?;
        }

        let payload = self.build_payload(&obj, starts_at, now);
        let new_id = self.backend.upsert(&payload)?;

        if recorded_id.as_deref() == Some(new_id.as_str()) {
            return Ok(ReconcileOutcome::RequeueAfter(self.config.requeue_interval()));
        }

        obj.status.alertmanager_id = Some(new_id.clone());
        obj.status.last_applied_generation = obj.generation;

        if let Err(err) = self.store.update_status(&obj) {
            // The freshly written silence is not referenced by any status;
            // delete it again rather than leak it. If even that fails, the
            // next cycle's duplicate search re-adopts the orphan.
            warn!(silence = %obj.id, error = %err, "status update failed, deleting alertmanager silence");

            match self.backend.delete(&new_id) {
                Ok(()) => {}
                Err(del_err) if del_err.is_not_found() => {}
                Err(del_err) => {
                    error!(silence = %obj.id, id = %new_id, error = %del_err,
                        "unable to delete alertmanager silence after failed status update");
                }
            }

            return Err(err.into());
        }

        info!(silence = %obj.id, id = %new_id, generation = obj.generation,
            "alertmanager silence in sync");

        Ok(ReconcileOutcome::RequeueAfter(self.config.requeue_interval()))
    }

    /// Tears down the backend silence and releases the finalizer.
    ///
    /// A failing backend delete leaves the finalizer in place and surfaces
    /// a retryable error, so the object can never finalize while an owned
    /// silence may still exist. Not-found deletes are success.
    fn finalize(&self, obj: &mut Silence) -> Result<ReconcileOutcome> {
        if let Some(am_id) = obj.status.alertmanager_id.clone() {
            info!(silence = %obj.id, id = %am_id, "deleting alertmanager silence");

            match self.backend.delete(&am_id) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    debug!(silence = %obj.id, id = %am_id, "alertmanager silence already gone");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if obj.remove_finalizer(SILENCE_FINALIZER) {
            self.store.update_meta(obj)?;
            info!(silence = %obj.id, "removed finalizer");
        }

        Ok(ReconcileOutcome::Done)
    }

    /// Searches the backend for a non-expired silence matching this
    /// object's filter strings and adopts its identifier.
    ///
    /// This is the recovery path for a lost identifier (for example after
    /// a failed status write): without it, a second silence would be
    /// created for the same intent.
    fn adopt_existing(&self, obj: &mut Silence) -> Result<()> {
        let filters = hush_types::filter_strings(&obj.spec.matchers);
        let candidates = self.backend.search(&filters)?;

        for existing in candidates {
            if existing.state.is_expired() {
                continue;
            }

            if existing.matchers.len() == obj.spec.matchers.len() {
                info!(silence = %obj.id, id = %existing.id, "adopting existing alertmanager silence");
                obj.status.alertmanager_id = Some(existing.id);
                return Ok(());
            }
        }

        debug!(silence = %obj.id, "no existing alertmanager silence matches, a new one will be created");
        Ok(())
    }

    fn build_payload(
        &self,
        obj: &Silence,
        starts_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> PostableSilence {
        PostableSilence {
            id: obj.status.alertmanager_id.clone(),
            matchers: obj.spec.matchers.clone(),
            comment: format!("{}\nInstance: {}", obj.spec.comment, self.config.instance),
            created_by: self.config.author.clone(),
            starts_at: starts_at.unwrap_or(now),
            ends_at: now + chrono::Duration::seconds(self.config.silence_duration_secs as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hush_alertmanager::InMemorySilenceApi;
    use hush_types::{Matcher, SilenceSpec};

    use crate::store::InMemorySilenceStore;

    type TestReconciler = SilenceReconciler<Arc<InMemorySilenceStore>, Arc<InMemorySilenceApi>>;

    fn setup() -> (Arc<InMemorySilenceStore>, Arc<InMemorySilenceApi>, TestReconciler) {
        let store = Arc::new(InMemorySilenceStore::new());
        let api = Arc::new(InMemorySilenceApi::new());
        let reconciler = SilenceReconciler::new(
            Arc::clone(&store),
            Arc::clone(&api),
            ReconcilerConfig::default(),
        );
        (store, api, reconciler)
    }

    fn sample_id() -> SilenceId {
        SilenceId::new("monitoring", "db-maintenance")
    }

    fn sample_spec() -> SilenceSpec {
        SilenceSpec::new(vec![
            Matcher::equal("alertname", "HighCPU"),
            Matcher::equal("cluster", "prod"),
        ])
        .with_comment("planned maintenance")
    }

    /// Reconciles until the backend silence exists and status is persisted.
    fn converge(store: &InMemorySilenceStore, reconciler: &TestReconciler) -> String {
        let id = sample_id();
        store.apply(id.clone(), sample_spec());

        assert_eq!(
            reconciler.reconcile(&id).expect("add finalizer"),
            ReconcileOutcome::Requeue
        );
        reconciler.reconcile(&id).expect("create silence");

        store
            .get(&id)
            .expect("get")
            .expect("present")
            .status
            .alertmanager_id
            .expect("silence created")
    }

    #[test]
    fn missing_object_is_already_finalized() {
        let (_store, api, reconciler) = setup();

        let outcome = reconciler.reconcile(&sample_id()).expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Done);
        assert!(api.is_empty());
    }

    #[test]
    fn first_reconcile_adds_finalizer_before_any_backend_write() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());

        let outcome = reconciler.reconcile(&sample_id()).expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Requeue);

        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.has_finalizer(SILENCE_FINALIZER));
        // No backend side effect yet.
        assert!(api.is_empty());
        assert_eq!(api.upsert_count(), 0);
    }

    #[test]
    fn second_reconcile_creates_silence_and_persists_status() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());

        reconciler.reconcile(&sample_id()).expect("add finalizer");
        let outcome = reconciler.reconcile(&sample_id()).expect("create");
        assert_eq!(
            outcome,
            ReconcileOutcome::RequeueAfter(Duration::from_secs(300))
        );

        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.status.alertmanager_id.is_some());
        assert_eq!(obj.status.last_applied_generation, obj.generation);
        assert_eq!(api.len(), 1);

        let silence = api
            .get(obj.status.alertmanager_id.as_deref().expect("id"))
            .expect("backend silence");
        assert_eq!(silence.matchers.len(), 2);
        assert_eq!(silence.created_by, "hushd");
        assert!(silence.comment.contains("planned maintenance"));
        assert!(silence.comment.contains("Instance: hushd"));
    }

    #[test]
    fn unchanged_object_far_from_expiry_performs_no_write() {
        let (store, api, reconciler) = setup();
        converge(&store, &reconciler);
        assert_eq!(api.upsert_count(), 1);

        let outcome = reconciler.reconcile(&sample_id()).expect("steady state");
        assert_eq!(
            outcome,
            ReconcileOutcome::RequeueAfter(Duration::from_secs(300))
        );
        assert_eq!(api.upsert_count(), 1);

        // And again: duplicate triggers change nothing.
        reconciler.reconcile(&sample_id()).expect("steady state");
        assert_eq!(api.upsert_count(), 1);
    }

    #[test]
    fn silence_is_extended_near_expiry() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);

        let original = api.get(&am_id).expect("get");

        // Within three intervals of the end time: must be rewritten.
        let near = original.ends_at - chrono::Duration::seconds(600);
        reconciler
            .reconcile_at(&sample_id(), near)
            .expect("extension");
        assert_eq!(api.upsert_count(), 2);

        let extended = api.get(&am_id).expect("get");
        assert!(extended.ends_at > original.ends_at);
        // The original start time is preserved across the extension.
        assert_eq!(extended.starts_at, original.starts_at);
    }

    #[test]
    fn extension_bound_is_three_intervals() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);
        let ends_at = api.get(&am_id).expect("get").ends_at;

        // Just outside the 3-interval window: no write.
        let far = ends_at - chrono::Duration::seconds(3 * 300 + 30);
        reconciler.reconcile_at(&sample_id(), far).expect("no-op");
        assert_eq!(api.upsert_count(), 1);

        // Just inside the window: write.
        let near = ends_at - chrono::Duration::seconds(3 * 300 - 30);
        reconciler.reconcile_at(&sample_id(), near).expect("extend");
        assert_eq!(api.upsert_count(), 2);
    }

    #[test]
    fn suspended_object_gets_finalizer_but_no_backend_action() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec().suspended(true));

        assert_eq!(
            reconciler.reconcile(&sample_id()).expect("finalizer"),
            ReconcileOutcome::Requeue
        );
        assert_eq!(
            reconciler.reconcile(&sample_id()).expect("suspended"),
            ReconcileOutcome::Done
        );
        assert!(api.is_empty());
    }

    #[test]
    fn spec_change_triggers_immediate_rewrite() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);
        assert_eq!(api.upsert_count(), 1);

        store.apply(sample_id(), sample_spec().with_comment("changed comment"));

        reconciler.reconcile(&sample_id()).expect("rewrite");
        assert_eq!(api.upsert_count(), 2);
        assert!(
            api.get(&am_id)
                .expect("get")
                .comment
                .contains("changed comment")
        );
    }

    #[test]
    fn expired_silence_is_rewritten() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);

        assert!(api.expire(&am_id));

        reconciler.reconcile(&sample_id()).expect("rewrite");
        assert_eq!(api.upsert_count(), 2);
        assert!(!api.get(&am_id).expect("get").state.is_expired());
    }

    #[test]
    fn externally_deleted_silence_is_recreated() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);

        api.delete(&am_id).expect("external delete");
        assert!(api.is_empty());

        reconciler.reconcile(&sample_id()).expect("recreate");

        assert_eq!(api.len(), 1);
        let obj = store.get(&sample_id()).expect("get").expect("present");
        let new_id = obj.status.alertmanager_id.expect("recreated");
        assert!(api.get(&new_id).is_ok());
    }

    #[test]
    fn lost_identifier_adopts_existing_silence() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);

        // Simulate a lost identifier (e.g. a failed status write).
        let mut obj = store.get(&sample_id()).expect("get").expect("present");
        obj.status.alertmanager_id = None;
        store.update_status(&obj).expect("clear status");

        reconciler.reconcile(&sample_id()).expect("adopt");

        // No duplicate was created; the original silence was adopted.
        assert_eq!(api.len(), 1);
        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert_eq!(obj.status.alertmanager_id.as_deref(), Some(am_id.as_str()));
    }

    #[test]
    fn terminating_object_deletes_silence_and_finalizes() {
        let (store, api, reconciler) = setup();
        converge(&store, &reconciler);

        assert!(store.mark_deleted(&sample_id()));
        let outcome = reconciler.reconcile(&sample_id()).expect("finalize");
        assert_eq!(outcome, ReconcileOutcome::Done);

        assert!(api.is_empty());
        assert!(store.get(&sample_id()).expect("get").is_none());
    }

    #[test]
    fn failing_backend_delete_blocks_finalization() {
        let (store, api, reconciler) = setup();
        converge(&store, &reconciler);

        store.mark_deleted(&sample_id());
        api.fail_next_delete();

        assert!(reconciler.reconcile(&sample_id()).is_err());

        // Finalizer retained, object not removed, silence still present.
        let obj = store.get(&sample_id()).expect("get").expect("still present");
        assert!(obj.has_finalizer(SILENCE_FINALIZER));
        assert_eq!(api.len(), 1);

        // The retry succeeds and completes the lifecycle.
        assert_eq!(
            reconciler.reconcile(&sample_id()).expect("retry"),
            ReconcileOutcome::Done
        );
        assert!(api.is_empty());
        assert!(store.get(&sample_id()).expect("get").is_none());
    }

    #[test]
    fn terminating_tolerates_already_deleted_silence() {
        let (store, api, reconciler) = setup();
        let am_id = converge(&store, &reconciler);

        api.delete(&am_id).expect("external delete");
        store.mark_deleted(&sample_id());

        assert_eq!(
            reconciler.reconcile(&sample_id()).expect("finalize"),
            ReconcileOutcome::Done
        );
        assert!(store.get(&sample_id()).expect("get").is_none());
    }

    #[test]
    fn terminating_without_backend_id_skips_delete() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());
        reconciler.reconcile(&sample_id()).expect("add finalizer");

        store.mark_deleted(&sample_id());
        assert_eq!(
            reconciler.reconcile(&sample_id()).expect("finalize"),
            ReconcileOutcome::Done
        );

        assert_eq!(api.delete_count(), 0);
        assert!(store.get(&sample_id()).expect("get").is_none());
    }

    #[test]
    fn failed_status_write_deletes_orphaned_silence() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());
        reconciler.reconcile(&sample_id()).expect("add finalizer");

        store.fail_next_status_update();
        assert!(reconciler.reconcile(&sample_id()).is_err());

        // The silence written in this cycle was compensated away.
        assert!(api.is_empty());
        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.status.alertmanager_id.is_none());

        // The next cycle repairs the drift.
        reconciler.reconcile(&sample_id()).expect("repair");
        assert_eq!(api.len(), 1);
        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.status.alertmanager_id.is_some());
    }

    #[test]
    fn failed_compensation_leaves_orphan_for_adoption() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());
        reconciler.reconcile(&sample_id()).expect("add finalizer");

        // Status write fails and so does the compensating delete: the
        // silence written this cycle is orphaned.
        store.fail_next_status_update();
        api.fail_next_delete();
        assert!(reconciler.reconcile(&sample_id()).is_err());

        assert_eq!(api.len(), 1);
        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.status.alertmanager_id.is_none());

        // The next cycle adopts the orphan instead of creating a second
        // silence, and persists its identifier.
        reconciler.reconcile(&sample_id()).expect("adopt orphan");

        assert_eq!(api.len(), 1);
        let obj = store.get(&sample_id()).expect("get").expect("present");
        assert!(obj.status.alertmanager_id.is_some());
    }

    #[test]
    fn adoption_skips_expired_and_mismatched_candidates() {
        let (store, api, reconciler) = setup();
        store.apply(sample_id(), sample_spec());
        reconciler.reconcile(&sample_id()).expect("add finalizer");

        // An expired silence with the same matchers must not be adopted.
        let now = Utc::now();
        let expired_id = api.insert(hush_types::AlertmanagerSilence {
            id: String::new(),
            matchers: sample_spec().matchers,
            comment: "stale".to_string(),
            created_by: "hushd".to_string(),
            starts_at: now - chrono::Duration::hours(2),
            ends_at: now - chrono::Duration::hours(1),
            state: hush_types::SilenceState::Expired,
        });

        // Neither must a live silence with extra matchers, even though it
        // satisfies the filter search.
        let mut extra = sample_spec().matchers;
        extra.push(Matcher::equal("severity", "critical"));
        let superset_id = api.insert(hush_types::AlertmanagerSilence {
            id: String::new(),
            matchers: extra,
            comment: "broader silence".to_string(),
            created_by: "someone-else".to_string(),
            starts_at: now,
            ends_at: now + chrono::Duration::hours(1),
            state: hush_types::SilenceState::Active,
        });

        reconciler.reconcile(&sample_id()).expect("create");

        let obj = store.get(&sample_id()).expect("get").expect("present");
        let adopted = obj.status.alertmanager_id.as_deref();
        assert_ne!(adopted, Some(expired_id.as_str()));
        assert_ne!(adopted, Some(superset_id.as_str()));
        // A fresh silence exists alongside both leftovers.
        assert_eq!(api.len(), 3);
    }
}
