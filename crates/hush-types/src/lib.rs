//! Resource model for the hush silence operator.
//!
//! `hush-types` defines the declared-state objects and their Alertmanager
//! counterparts:
//!
//! - [`Silence`]: the desired-state object an operator declares, with
//!   metadata (generation, finalizers, deletion marker), a [`SilenceSpec`]
//!   and a reconciler-owned [`SilenceStatus`]
//! - [`Matcher`]: one label-match condition, with its canonical
//!   filter-string encoding used as an idempotent search filter
//! - [`AlertmanagerSilence`] / [`PostableSilence`]: the backend's live
//!   silence object and its create-or-replace payload
//!
//! # Example
//!
//! ```rust
//! use hush_types::{filter_strings, Matcher, Silence, SilenceId, SilenceSpec};
//!
//! let spec = SilenceSpec::new(vec![
//!     Matcher::equal("alertname", "HighCPU"),
//!     Matcher::equal("cluster", "prod-.*").regex(),
//! ])
//! .with_comment("planned database maintenance");
//!
//! let silence = Silence::new(SilenceId::new("monitoring", "db-maintenance"), spec);
//! silence.validate().unwrap();
//!
//! let filters = filter_strings(&silence.spec.matchers);
//! assert_eq!(filters, ["alertname=HighCPU", "cluster~prod-.*"]);
//! ```

#![forbid(unsafe_code)]

pub mod alertmanager;
pub mod error;
pub mod matcher;
pub mod silence;

// Re-export main types at crate root
pub use alertmanager::{AlertmanagerSilence, PostableSilence, SilenceState};
pub use error::{Result, SilenceError};
pub use matcher::{filter_strings, Matcher};
pub use silence::{Silence, SilenceId, SilenceSpec, SilenceStatus, SILENCE_FINALIZER};
