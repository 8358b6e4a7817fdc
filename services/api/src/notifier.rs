//! Push delivery collaborator
//!
//! Delivers `{token, title, body, data}` to one registered device. The push
//! transport itself lives behind an HTTP endpoint; without one configured,
//! messages are only logged.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PushSettings;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push request failed: {0}")]
    Request(String),

    #[error("Push endpoint answered with status {0}")]
    Status(u16),
}

/// One message for one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// Sender used when no push endpoint is configured
#[derive(Debug, Clone, Default)]
pub struct LogSender;

#[async_trait]
impl PushSender for LogSender {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        info!(
            token = %message.token,
            title = %message.title,
            "Push delivery skipped, no endpoint configured"
        );
        Ok(())
    }
}

/// Posts each message as JSON to the configured endpoint
pub struct HttpPushSender {
    endpoint: String,
    server_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpPushSender {
    pub fn new(
        endpoint: &str,
        server_key: Option<String>,
        timeout_seconds: u64,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            server_key,
            http_client,
        })
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        let mut request = self.http_client.post(&self.endpoint).json(message);
        if let Some(key) = &self.server_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Push endpoint rejected message");
            return Err(PushError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Build the sender the settings ask for
pub fn from_settings(settings: &PushSettings) -> anyhow::Result<Arc<dyn PushSender>> {
    match settings.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => Ok(Arc::new(HttpPushSender::new(
            endpoint,
            settings.server_key.clone(),
            settings.timeout_seconds,
        )?)),
        _ => Ok(Arc::new(LogSender)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> PushMessage {
        PushMessage {
            token: "device-1".to_string(),
            title: "Hello".to_string(),
            body: "World".to_string(),
            data: json!({}),
        }
    }

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let sender = from_settings(&PushSettings::default()).unwrap();
        assert!(sender.send(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        // Bind then drop so the port is closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let sender = HttpPushSender::new(&format!("http://{}/push", address), None, 2).unwrap();
        assert!(matches!(
            sender.send(&message()).await,
            Err(PushError::Request(_))
        ));
    }
}
