//! Completion notification.
//!
//! One outbound call per completed request. Delivery is best-effort: the
//! pipeline logs failures and moves on, it never retries or escalates.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level failure (connect, DNS, timeout).
    #[error("Webhook request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Webhook returned status {0}")]
    Status(u16),
}

/// Webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Endpoint that receives completion events.
    pub url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Trait for completion notification backends.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a completion event for the given request. Single attempt.
    async fn notify(&self, request_id: &str) -> Result<(), NotifyError>;
}

/// HTTP webhook notifier.
pub struct WebhookNotifier {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    /// Create a new webhook notifier with the given configuration.
    pub fn new(config: WebhookConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, request_id: &str) -> Result<(), NotifyError> {
        debug!("Delivering completion webhook for request {}", request_id);

        let response = self
            .client
            .post(&self.config.url)
            .json(&json!({
                "request_id": request_id,
                "status": "completed",
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        Ok(())
    }
}
