//! Delivery seam for Web Push.
//!
//! The dispatcher only sees [`PushTransport`]; production uses the
//! VAPID-authenticated reqwest implementation, tests substitute a mock.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::PushConfig;
use crate::models::PushSubscription;

#[derive(Debug, Error)]
pub enum PushSendError {
    /// The push service reports the endpoint no longer exists (HTTP 404/410).
    /// The subscription should be pruned.
    #[error("push endpoint is gone")]
    Gone,

    #[error("push delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, sub: &PushSubscription, payload: &str) -> Result<(), PushSendError>;
}

/// Web Push over HTTP with VAPID authorization. Payload encryption is left
/// to the push gateway deployment; see DESIGN.md.
pub struct WebPushTransport {
    http: reqwest::Client,
    config: PushConfig,
}

impl WebPushTransport {
    pub fn new(config: PushConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(&self, sub: &PushSubscription, payload: &str) -> Result<(), PushSendError> {
        let authorization = super::vapid::authorization_header(&self.config, &sub.endpoint)
            .map_err(|e| PushSendError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(&sub.endpoint)
            .header("Authorization", authorization)
            .header("TTL", "86400")
            .header("Urgency", "normal")
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| PushSendError::Transport(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(PushSendError::Gone),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(PushSendError::Transport(format!("status {s}: {body}")))
            }
        }
    }
}
