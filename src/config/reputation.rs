use super::{parse_var, Source};
use crate::error::AppResult;
use serde::Deserialize;

/// Reputation lookup settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReputationConfig {
    /// Google Safe Browsing key; lookups are disabled without one
    pub google_api_key: Option<String>,

    /// Timeout in seconds for a single lookup
    pub timeout_seconds: u64,
}

impl ReputationConfig {
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        Ok(Self {
            google_api_key: source("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty()),
            timeout_seconds: parse_var(source, "REPUTATION_TIMEOUT_SECONDS", 5)?,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("REPUTATION_TIMEOUT_SECONDS must be greater than 0".to_string());
        }

        Ok(())
    }
}
