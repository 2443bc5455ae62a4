use super::{parse_var, Source};
use crate::error::AppResult;
use serde::Deserialize;

/// Webhook delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Timeout in seconds for one delivery
    pub timeout_seconds: u64,
}

impl WebhookConfig {
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        Ok(Self {
            timeout_seconds: parse_var(source, "WEBHOOK_TIMEOUT_SECONDS", 10)?,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("WEBHOOK_TIMEOUT_SECONDS must be greater than 0".to_string());
        }

        Ok(())
    }
}
