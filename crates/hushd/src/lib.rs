//! hushd - the hush silence operator daemon.
//!
//! Watches a directory of silence manifests and keeps each declared
//! silence in sync with an Alertmanager backend through the
//! [`hush_reconcile`] state machine: creating silences, extending them
//! before expiry, and deleting them when their manifest disappears.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod manifest;
pub mod scanner;
pub mod worker;

pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
pub use manifest::SilenceManifest;
pub use scanner::sync_manifests;
pub use worker::{spawn_workers, TriggerRouter};
