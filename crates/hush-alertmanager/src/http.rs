//! HTTP client for the Alertmanager v2 silence API.
//!
//! Speaks the four silence endpoints (`GET`/`POST /api/v2/silences`,
//! `GET`/`DELETE /api/v2/silence/{id}`) with a bounded request timeout so
//! no reconcile worker can block indefinitely on a stuck backend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use hush_types::{AlertmanagerSilence, Matcher, PostableSilence, SilenceState};

use crate::api::SilenceApi;
use crate::error::{AlertmanagerError, Result};

/// Blocking HTTP client for an Alertmanager instance.
#[derive(Debug, Clone)]
pub struct HttpSilenceApi {
    base_url: String,
    client: Client,
}

impl HttpSilenceApi {
    /// Creates a client for the given base URL with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AlertmanagerError::Transport` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { base_url, client })
    }

    /// Returns the normalized base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl SilenceApi for HttpSilenceApi {
    fn search(&self, filters: &[String]) -> Result<Vec<AlertmanagerSilence>> {
        let query: Vec<(&str, &String)> = filters.iter().map(|f| ("filter", f)).collect();

        let response = self
            .client
            .get(self.url("/api/v2/silences"))
            .query(&query)
            .send()
            .map_err(transport)?;

        let silences: Vec<GettableSilence> = parse_json(check_status(response, None)?)?;
        debug!(count = silences.len(), "silence search completed");

        Ok(silences.into_iter().map(Into::into).collect())
    }

    fn get(&self, id: &str) -> Result<AlertmanagerSilence> {
        let response = self
            .client
            .get(self.url(&format!("/api/v2/silence/{id}")))
            .send()
            .map_err(transport)?;

        let silence: GettableSilence = parse_json(check_status(response, Some(id))?)?;
        Ok(silence.into())
    }

    fn upsert(&self, silence: &PostableSilence) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/v2/silences"))
            .json(silence)
            .send()
            .map_err(transport)?;

        let created: PostSilencesResponse = parse_json(check_status(response, None)?)?;
        debug!(id = %created.silence_id, "silence upserted");

        Ok(created.silence_id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/v2/silence/{id}")))
            .send()
            .map_err(transport)?;

        check_status(response, Some(id))?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> AlertmanagerError {
    AlertmanagerError::Transport {
        reason: err.to_string(),
    }
}

fn check_status(response: Response, id: Option<&str>) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(AlertmanagerError::NotFound {
            id: id.unwrap_or("<search>").to_string(),
        });
    }

    if !status.is_success() {
        let reason = response
            .text()
            .unwrap_or_else(|_| "<unreadable response body>".to_string());
        return Err(AlertmanagerError::Api {
            status: status.as_u16(),
            reason,
        });
    }

    Ok(response)
}

fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .map_err(|e| AlertmanagerError::Serialization(e.to_string()))
}

/// Wire form of a silence as returned by the v2 API, where the lifecycle
/// state is nested under `status.state`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GettableSilence {
    id: String,
    matchers: Vec<Matcher>,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    created_by: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: GettableSilenceStatus,
}

#[derive(Debug, Deserialize)]
struct GettableSilenceStatus {
    state: SilenceState,
}

impl From<GettableSilence> for AlertmanagerSilence {
    fn from(wire: GettableSilence) -> Self {
        Self {
            id: wire.id,
            matchers: wire.matchers,
            comment: wire.comment,
            created_by: wire.created_by,
            starts_at: wire.starts_at,
            ends_at: wire.ends_at,
            state: wire.status.state,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostSilencesResponse {
    #[serde(rename = "silenceID")]
    silence_id: String,
}
