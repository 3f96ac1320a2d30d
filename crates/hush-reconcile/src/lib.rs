//! Reconciliation engine keeping declared silences in sync with an
//! Alertmanager backend.
//!
//! The [`SilenceReconciler`] drives one declared [`hush_types::Silence`]
//! at a time through its lifecycle: finalizer management, suspension,
//! drift detection against the backend, early extension before expiry,
//! duplicate adoption, and guaranteed cleanup on deletion. Desired state
//! is read through the [`SilenceStore`] trait; the backend is reached
//! through [`hush_alertmanager::SilenceApi`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use hush_alertmanager::InMemorySilenceApi;
//! use hush_reconcile::{
//!     InMemorySilenceStore, ReconcileOutcome, ReconcilerConfig, SilenceReconciler,
//! };
//! use hush_types::{Matcher, SilenceId, SilenceSpec};
//!
//! let store = Arc::new(InMemorySilenceStore::new());
//! let api = Arc::new(InMemorySilenceApi::new());
//! let reconciler =
//!     SilenceReconciler::new(Arc::clone(&store), Arc::clone(&api), ReconcilerConfig::default());
//!
//! let id = SilenceId::new("monitoring", "db-maintenance");
//! store.apply(
//!     id.clone(),
//!     SilenceSpec::new(vec![Matcher::equal("alertname", "HighCPU")])
//!         .with_comment("planned maintenance"),
//! );
//!
//! // First pass records the cleanup finalizer, second creates the silence.
//! assert_eq!(reconciler.reconcile(&id).unwrap(), ReconcileOutcome::Requeue);
//! reconciler.reconcile(&id).unwrap();
//! assert_eq!(api.len(), 1);
//! ```

#![forbid(unsafe_code)]

mod error;
mod reconciler;
mod store;

pub use error::{ReconcileError, Result};
pub use reconciler::{ReconcileOutcome, ReconcilerConfig, SilenceReconciler};
pub use store::{InMemorySilenceStore, SilenceStore, StoreError};
