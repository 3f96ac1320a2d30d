//! Manifest directory scanning.
//!
//! Translates the manifest directory into desired-state store operations:
//! new and changed manifests are applied, manifests that disappeared mark
//! their objects for deletion. Returns the identities whose state moved so
//! the caller can trigger reconciliation for exactly those.

use std::collections::HashSet;

use tracing::{debug, info};

use hush_reconcile::InMemorySilenceStore;
use hush_types::SilenceId;

use crate::manifest::SilenceManifest;

/// Applies a manifest snapshot to the store and returns the identities
/// that changed and need a reconcile trigger.
pub fn sync_manifests(
    store: &InMemorySilenceStore,
    manifests: &[SilenceManifest],
) -> Vec<SilenceId> {
    let mut triggered = Vec::new();
    let declared: HashSet<SilenceId> = manifests.iter().map(SilenceManifest::id).collect();

    for manifest in manifests {
        let id = manifest.id();
        if store.apply(id.clone(), manifest.spec()) {
            info!(silence = %id, "manifest applied");
            triggered.push(id);
        }
    }

    // Objects with no backing manifest are deleted; their finalizer keeps
    // them around until the backend silence is cleaned up.
    for id in store.ids() {
        if !declared.contains(&id) && store.mark_deleted(&id) {
            info!(silence = %id, "manifest removed, deleting silence");
            triggered.push(id);
        }
    }

    debug!(
        declared = declared.len(),
        triggered = triggered.len(),
        "manifest scan complete"
    );

    triggered
}
