//! Alertmanager-side silence representations.
//!
//! [`AlertmanagerSilence`] is the backend's live object; its `expired` state
//! is reached automatically when the end time elapses, a transition the
//! backend owns. [`PostableSilence`] is the create-or-replace payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::Matcher;

/// Lifecycle state of an Alertmanager silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilenceState {
    /// The silence's start time is in the future.
    Pending,
    /// The silence is currently suppressing matching alerts.
    Active,
    /// The silence's end time has elapsed.
    Expired,
}

impl SilenceState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }

    /// Returns true if the silence has expired.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl std::fmt::Display for SilenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A live silence object as reported by the Alertmanager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerSilence {
    /// Backend-assigned identifier.
    pub id: String,
    /// Matchers the silence applies to.
    pub matchers: Vec<Matcher>,
    /// Free-text comment.
    pub comment: String,
    /// Creator string.
    pub created_by: String,
    /// When suppression starts.
    pub starts_at: DateTime<Utc>,
    /// When suppression ends; the backend expires the silence past this.
    pub ends_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: SilenceState,
}

impl AlertmanagerSilence {
    /// Derives the lifecycle state from the time bounds at `now`.
    #[must_use]
    pub fn state_at(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>, now: DateTime<Utc>) -> SilenceState {
        if ends_at <= now {
            SilenceState::Expired
        } else if starts_at > now {
            SilenceState::Pending
        } else {
            SilenceState::Active
        }
    }
}

/// Create-or-replace payload for an Alertmanager silence.
///
/// An absent `id` creates a new silence; a known `id` replaces the existing
/// one while keeping its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostableSilence {
    /// Identifier of the silence to replace, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Matchers the silence applies to.
    pub matchers: Vec<Matcher>,
    /// Free-text comment.
    pub comment: String,
    /// Creator string.
    pub created_by: String,
    /// When suppression starts.
    pub starts_at: DateTime<Utc>,
    /// When suppression ends.
    pub ends_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn state_as_str() {
        assert_eq!(SilenceState::Pending.as_str(), "pending");
        assert_eq!(SilenceState::Active.as_str(), "active");
        assert_eq!(SilenceState::Expired.as_str(), "expired");
    }

    #[test]
    fn only_expired_is_expired() {
        assert!(SilenceState::Expired.is_expired());
        assert!(!SilenceState::Active.is_expired());
        assert!(!SilenceState::Pending.is_expired());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&SilenceState::Expired).expect("serialize");
        assert_eq!(json, r#""expired""#);
    }

    #[test]
    fn state_at_derivation() {
        let now = Utc::now();
        let hour = Duration::hours(1);

        assert_eq!(
            AlertmanagerSilence::state_at(now - hour, now + hour, now),
            SilenceState::Active
        );
        assert_eq!(
            AlertmanagerSilence::state_at(now + hour, now + hour * 2, now),
            SilenceState::Pending
        );
        assert_eq!(
            AlertmanagerSilence::state_at(now - hour * 2, now - hour, now),
            SilenceState::Expired
        );
    }

    #[test]
    fn postable_omits_absent_id() {
        let now = Utc::now();
        let payload = PostableSilence {
            id: None,
            matchers: vec![Matcher::equal("alertname", "HighCPU")],
            comment: "c".to_string(),
            created_by: "hushd".to_string(),
            starts_at: now,
            ends_at: now + Duration::hours(1),
        };

        let json = serde_json::to_value(&payload).expect("serialize");
        assert!(json.get("id").is_none());
        assert_eq!(json["createdBy"], "hushd");
        assert!(json.get("startsAt").is_some());
    }

    #[test]
    fn postable_keeps_known_id() {
        let now = Utc::now();
        let payload = PostableSilence {
            id: Some("abc-123".to_string()),
            matchers: Vec::new(),
            comment: String::new(),
            created_by: String::new(),
            starts_at: now,
            ends_at: now,
        };

        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["id"], "abc-123");
    }
}
