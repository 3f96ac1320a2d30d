//! The declared silence resource.
//!
//! A [`Silence`] is the desired-state object an operator declares: "this
//! class of alerts should be suppressed". The reconciler owns its
//! [`SilenceStatus`]; users own the spec. Deletion is deferred through a
//! finalizer so the backing Alertmanager silence is cleaned up before the
//! object disappears from the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SilenceError};
use crate::matcher::Matcher;

/// Finalizer recorded on every managed silence before any backend side
/// effect is attempted.
pub const SILENCE_FINALIZER: &str = "hush.dev/silence-cleanup";

/// Unique identity of a declared silence: namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SilenceId {
    /// Namespace the silence lives in.
    pub namespace: String,
    /// Name of the silence within its namespace.
    pub name: String,
}

impl SilenceId {
    /// Creates a new silence identity.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SilenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// User intent: which alerts to suppress and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceSpec {
    /// Label-match conditions selecting the suppressed alerts.
    pub matchers: Vec<Matcher>,
    /// Free-text comment carried into the Alertmanager silence.
    #[serde(default)]
    pub comment: String,
    /// When set, reconciliation performs no backend action.
    #[serde(default)]
    pub suspend: bool,
}

impl SilenceSpec {
    /// Creates a spec from a matcher list.
    #[must_use]
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self {
            matchers,
            comment: String::new(),
            suspend: false,
        }
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the suspend flag.
    #[must_use]
    pub const fn suspended(mut self, suspend: bool) -> Self {
        self.suspend = suspend;
        self
    }

    /// Validates the spec.
    ///
    /// # Errors
    ///
    /// Returns `SilenceError::InvalidSilence` if the matcher list is empty
    /// and `SilenceError::InvalidMatcher` for the first invalid matcher.
    pub fn validate(&self) -> Result<()> {
        if self.matchers.is_empty() {
            return Err(SilenceError::InvalidSilence {
                reason: "spec must declare at least one matcher".to_string(),
            });
        }

        for matcher in &self.matchers {
            matcher.validate()?;
        }

        Ok(())
    }
}

/// Reconciliation-derived state attached to a declared silence.
///
/// Mutated only by the reconciler, never by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceStatus {
    /// Identifier of the Alertmanager silence backing this object, if one
    /// has been created.
    pub alertmanager_id: Option<String>,
    /// The generation that was last successfully applied to the backend.
    pub last_applied_generation: u64,
}

/// A declared silence object: identity, metadata, spec and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    /// Unique identity (namespace + name).
    pub id: SilenceId,
    /// Optimistic-write guard, bumped by the store on every persisted write.
    pub resource_version: u64,
    /// Bumped on every spec edit; drives "spec changed since last applied".
    pub generation: u64,
    /// Deletion marker. Once set, the object persists until finalization
    /// completes.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Cleanup-pending markers blocking removal from the store.
    #[serde(default)]
    pub finalizers: Vec<String>,
    /// User intent.
    pub spec: SilenceSpec,
    /// Reconciler-owned state.
    #[serde(default)]
    pub status: SilenceStatus,
}

impl Silence {
    /// Creates a new declared silence at generation 1.
    #[must_use]
    pub fn new(id: SilenceId, spec: SilenceSpec) -> Self {
        Self {
            id,
            resource_version: 0,
            generation: 1,
            deleted_at: None,
            finalizers: Vec::new(),
            spec,
            status: SilenceStatus::default(),
        }
    }

    /// Returns true if the deletion marker is set.
    #[must_use]
    pub const fn is_deleting(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the given finalizer is present.
    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Adds a finalizer if absent. Returns whether the set changed.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_string());
        true
    }

    /// Removes a finalizer if present. Returns whether the set changed.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        self.finalizers.len() != before
    }

    /// Validates the object's spec.
    ///
    /// # Errors
    ///
    /// See [`SilenceSpec::validate`].
    pub fn validate(&self) -> Result<()> {
        self.spec.validate()
    }
}
