//! Webhook delivery.
//!
//! Jobs hand finished [`WebhookMessage`]s to a [`Notifier`]. The production
//! implementation, [`DiscordWebhook`], POSTs the JSON document once; there is
//! no retry, the caller decides what a failed send means.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info};

use super::embed::WebhookMessage;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// Sink for outbound notification documents.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, message: &WebhookMessage) -> Result<(), NotifyError>;
}

/// POSTs messages to a Discord-compatible webhook URL.
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn post(&self, message: &WebhookMessage) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(message)?;

        let result = match self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Err(NotifyError::Status {
                    url: self.url.clone(),
                    status,
                    body,
                })
            }
            Err(e) => Err(NotifyError::Network {
                url: self.url.clone(),
                reason: e.to_string(),
            }),
        };

        match &result {
            Ok(()) => info!(embeds = message.embeds.len(), "Data sent to Discord successfully"),
            Err(e) => {
                let response = match e {
                    NotifyError::Status { body, .. } => body.as_str(),
                    _ => "",
                };
                let payload = serde_json::to_string(message).unwrap_or_default();
                error!(error = %e, response, payload, "Error sending to Discord");
            }
        }

        result
    }
}
