use super::{parse_var, Source};
use crate::error::AppResult;
use crate::jobs::WorkerConfig;
use serde::Deserialize;

/// Check worker settings
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Attempts per check before it is marked incomplete
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Checks run at the same time
    pub concurrency: usize,
}

impl QueueConfig {
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        let defaults = WorkerConfig::default();

        Ok(Self {
            max_attempts: parse_var(source, "WORKER_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_delay_ms: parse_var(source, "WORKER_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            concurrency: parse_var(source, "WORKER_CONCURRENCY", defaults.concurrency)?,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("WORKER_MAX_ATTEMPTS must be at least 1".to_string());
        }

        if self.concurrency == 0 {
            return Err("WORKER_CONCURRENCY must be at least 1".to_string());
        }

        Ok(())
    }
}

impl From<&QueueConfig> for WorkerConfig {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay_ms: config.retry_delay_ms,
            concurrency: config.concurrency,
        }
    }
}
