//! User-visible "machines are ready" alerts.
//!
//! The sweep reports a single count per run; how that reaches the user is a
//! delivery detail behind the [`Notifier`] trait.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivers one alert carrying the number of machines that became ready.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_ready(&self, count: usize) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log. The daemon default.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_ready(&self, count: usize) -> Result<(), NotifyError> {
        info!(count, "Machines ready: {}", ready_message(count));
        Ok(())
    }
}

/// Notifier that POSTs the ready summary to a configured webhook.
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_ready(&self, count: usize) -> Result<(), NotifyError> {
        let payload = json!({
            "title": "Machines Ready",
            "message": ready_message(count),
            "count": count,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| NotifyError::Delivery(error.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook answered {}",
                response.status()
            )));
        }

        debug!(count, url = %self.url, "ready notification delivered");
        Ok(())
    }
}

fn ready_message(count: usize) -> String {
    if count == 1 {
        "1 machine is ready".to_string()
    } else {
        format!("{count} machines are ready")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_pluralizes() {
        assert_eq!(ready_message(1), "1 machine is ready");
        assert_eq!(ready_message(3), "3 machines are ready");
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify_ready(2).await.is_ok());
    }
}
