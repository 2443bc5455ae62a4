use crate::models::BatchReport;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook target responded with {0}")]
    Status(u16),
}

/// Delivers a rendered batch to its webhook target
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn deliver(&self, target: &str, payload: &BatchReport) -> Result<(), WebhookError>;
}

/// Posts the batch report as JSON
#[derive(Clone)]
pub struct HttpWebhookSender {
    client: reqwest::Client,
}

impl HttpWebhookSender {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link-checker-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn deliver(&self, target: &str, payload: &BatchReport) -> Result<(), WebhookError> {
        let response = self.client.post(target).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = WebhookError::Status(503);
        assert_eq!(err.to_string(), "Webhook target responded with 503");
    }

    #[test]
    fn test_sender_builds() {
        assert!(HttpWebhookSender::new(Duration::from_secs(10)).is_ok());
    }
}
