//! Save endpoint abstraction.
//!
//! This module defines the `SaveEndpoint` trait so the saver can be driven
//! against a real server or a scripted mock without changing its logic.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, SaveError};
use crate::form::FieldValue;
use crate::request::{SaveAck, SaveKind, SaveOutcome, SaveRequest};

/// Longest server message carried into a `Rejected` reason.
const MAX_REASON_LEN: usize = 200;

/// Trait for persisting a form snapshot.
///
/// Implementations must not retry; a failed save is reported once and the
/// next edit or submit tries again.
#[async_trait]
pub trait SaveEndpoint: Send + Sync {
    /// Send one save request and wait for its outcome.
    async fn save(&self, request: &SaveRequest) -> SaveOutcome;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Posts snapshots as `multipart/form-data`, the way the browser form does.
#[derive(Clone)]
pub struct ReqwestSaveEndpoint {
    client: reqwest::Client,
    url: Url,
    csrf_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AckBody {
    /// `false` when the server answered 200 but declined the save
    success: Option<bool>,
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct RejectBody {
    message: Option<String>,
    error: Option<String>,
}

impl ReqwestSaveEndpoint {
    pub fn new(url: Url, timeout: Duration, csrf_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            csrf_token,
        })
    }

    fn build_form(&self, request: &SaveRequest) -> std::result::Result<Form, SaveError> {
        let mut form = Form::new();

        for (name, value) in request.snapshot.iter() {
            form = match value {
                FieldValue::Text(text) => form.text(name.to_string(), text.clone()),
                FieldValue::Choice(choice) => form.text(name.to_string(), choice.clone().unwrap_or_default()),
                FieldValue::File(None) => form,
                FieldValue::File(Some(attachment)) => {
                    let part = Part::bytes(attachment.data.to_vec())
                        .file_name(attachment.file_name.clone())
                        .mime_str(&attachment.content_type)
                        .map_err(|e| SaveError::Rejected {
                            status: None,
                            reason: format!("Cannot send {}: {}", attachment.file_name, e),
                        })?;
                    form.part(name.to_string(), part)
                }
            };
        }

        if let Some(token) = &self.csrf_token {
            form = form.text("csrf_token", token.clone());
        }

        form = match request.kind {
            SaveKind::AutoSave => form.text("auto_save", "true"),
            SaveKind::Submit(intent) => form.text(intent.form_field(), "1"),
        };

        Ok(form)
    }
}

#[async_trait]
impl SaveEndpoint for ReqwestSaveEndpoint {
    #[tracing::instrument(skip(self, request), fields(form_id = %request.form_id, seq = request.seq, kind = %request.kind))]
    async fn save(&self, request: &SaveRequest) -> SaveOutcome {
        let form = self.build_form(request)?;

        tracing::debug!(url = %self.url, fields = request.snapshot.len(), "Sending save request");

        let mut req = self.client.post(self.url.clone()).multipart(form);
        if let Some(token) = &self.csrf_token {
            req = req.header("X-CSRFToken", token);
        }

        let response = req.send().await.map_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "Save request failed");
            SaveError::NetworkFailure { message: e.to_string() }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SaveError::NetworkFailure {
            message: format!("Failed to read response body: {e}"),
        })?;

        if status.is_success() {
            let ack = serde_json::from_str::<AckBody>(&body).unwrap_or_default();

            if ack.success == Some(false) {
                let reason = rejection_reason(&body).unwrap_or_else(|| "Save failed".to_string());
                tracing::warn!(status = status.as_u16(), reason = %reason, "Save declined by server");
                return Err(SaveError::Rejected {
                    status: Some(status.as_u16()),
                    reason,
                });
            }

            let saved_at = ack.saved_at.unwrap_or_else(Utc::now);
            tracing::info!(status = status.as_u16(), %saved_at, "Save acknowledged");
            return Ok(SaveAck { saved_at });
        }

        let reason = rejection_reason(&body).unwrap_or_else(|| status.canonical_reason().unwrap_or("Save failed").to_string());

        tracing::warn!(status = status.as_u16(), reason = %reason, "Save rejected by server");
        Err(SaveError::Rejected {
            status: Some(status.as_u16()),
            reason,
        })
    }
}

/// Pull a displayable message out of an error body: a JSON `message` or
/// `error` field, or the body text itself.
fn rejection_reason(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let reason = match serde_json::from_str::<RejectBody>(body) {
        Ok(parsed) => parsed.message.or(parsed.error)?,
        Err(_) => body.to_string(),
    };

    Some(reason.chars().take(MAX_REASON_LEN).collect())
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock endpoint for testing.
///
/// Records every request and answers with scripted outcomes in FIFO order,
/// acknowledging with the current time once the script runs out. An optional
/// latency keeps each request in flight for a fixed time.
#[derive(Clone, Default)]
pub struct MockSaveEndpoint {
    outcomes: Arc<Mutex<VecDeque<SaveOutcome>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    latency: Arc<Mutex<Duration>>,
}

/// Record of a request made to the mock endpoint.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub request: SaveRequest,
    pub received_at: tokio::time::Instant,
}

impl MockSaveEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next unanswered request.
    pub fn push_outcome(&self, outcome: SaveOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn requests(&self) -> Vec<SaveRequest> {
        self.calls.lock().iter().map(|c| c.request.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SaveEndpoint for MockSaveEndpoint {
    async fn save(&self, request: &SaveRequest) -> SaveOutcome {
        self.calls.lock().push(MockCall {
            request: request.clone(),
            received_at: tokio::time::Instant::now(),
        });

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.outcomes.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(SaveAck { saved_at: Utc::now() }))
    }
}
