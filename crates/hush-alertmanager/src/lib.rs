//! Alertmanager silence API client for the hush silence operator.
//!
//! The reconciler depends on the [`SilenceApi`] trait only: search by
//! filter strings, get by identifier, create-or-replace, delete. Two
//! implementations are provided:
//!
//! - [`HttpSilenceApi`]: the Alertmanager v2 REST API over blocking HTTP
//!   with a bounded per-request timeout
//! - [`InMemorySilenceApi`]: a faithful in-process stand-in with write
//!   counters and failure injection, used by tests and local runs
//!
//! # Example
//!
//! ```rust
//! use hush_alertmanager::{InMemorySilenceApi, SilenceApi};
//! use hush_types::{Matcher, PostableSilence};
//! use chrono::{Duration, Utc};
//!
//! let api = InMemorySilenceApi::new();
//! let now = Utc::now();
//!
//! let id = api
//!     .upsert(&PostableSilence {
//!         id: None,
//!         matchers: vec![Matcher::equal("alertname", "HighCPU")],
//!         comment: "maintenance".to_string(),
//!         created_by: "hushd".to_string(),
//!         starts_at: now,
//!         ends_at: now + Duration::hours(1),
//!     })
//!     .unwrap();
//!
//! assert!(api.get(&id).is_ok());
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod error;
pub mod http;
pub mod memory;

// Re-export main types at crate root
pub use api::SilenceApi;
pub use error::{AlertmanagerError, Result};
pub use http::HttpSilenceApi;
pub use memory::InMemorySilenceApi;
