//! Label matchers and their canonical filter-string encoding.
//!
//! A [`Matcher`] is one label-based condition selecting which alerts a
//! silence suppresses. The filter-string form (`name=value`, `name~value`,
//! `name!=value`, `name!~value`) doubles as the idempotent search filter
//! used to find an existing Alertmanager silence for the same intent.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SilenceError};

/// One label-match condition: label name, comparison value, and the
/// regex/equality flags that select the comparison operator.
///
/// The serialized form uses the Alertmanager wire field names (`isRegex`,
/// `isEqual`), so the same type serves as both the declared matcher and the
/// create-payload matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    /// Label name to match on.
    pub name: String,
    /// Comparison value, a literal or a regular expression.
    pub value: String,
    /// Whether `value` is a regular expression rather than a literal.
    #[serde(default)]
    pub is_regex: bool,
    /// Positive (`true`) or negated (`false`) match.
    #[serde(default = "default_is_equal")]
    pub is_equal: bool,
}

const fn default_is_equal() -> bool {
    true
}

impl Matcher {
    /// Creates a positive literal matcher (`name=value`).
    #[must_use]
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: false,
            is_equal: true,
        }
    }

    /// Marks the value as a regular expression.
    #[must_use]
    pub const fn regex(mut self) -> Self {
        self.is_regex = true;
        self
    }

    /// Negates the match.
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.is_equal = false;
        self
    }

    /// Returns the comparison operator for this matcher.
    ///
    /// The operator composes the negation marker with the regex marker:
    /// equal+literal is `=`, equal+regex is `~`, negated+literal is `!=`,
    /// negated+regex is `!~`.
    #[must_use]
    pub const fn op_str(&self) -> &'static str {
        match (self.is_equal, self.is_regex) {
            (true, false) => "=",
            (true, true) => "~",
            (false, false) => "!=",
            (false, true) => "!~",
        }
    }

    /// Returns the canonical filter-string form `<name><op><value>`.
    #[must_use]
    pub fn filter_string(&self) -> String {
        format!("{}{}{}", self.name, self.op_str(), self.value)
    }

    /// Validates the matcher.
    ///
    /// # Errors
    ///
    /// Returns `SilenceError::InvalidMatcher` if the name is empty or a
    /// regex matcher carries a value that does not compile.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(SilenceError::InvalidMatcher {
                reason: "matcher name cannot be empty".to_string(),
            });
        }

        if self.is_regex {
            Regex::new(&self.value).map_err(|e| SilenceError::InvalidMatcher {
                reason: format!("value of '{}' is not a valid regex: {e}", self.name),
            })?;
        }

        Ok(())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filter_string())
    }
}

/// Encodes a matcher list into its filter-string form, one string per
/// matcher, order preserved.
#[must_use]
pub fn filter_strings(matchers: &[Matcher]) -> Vec<String> {
    matchers.iter().map(Matcher::filter_string).collect()
}
