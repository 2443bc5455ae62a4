mod database;
mod reputation;
mod server;
mod webhook;
mod worker;

pub use database::DatabaseConfig;
pub use reputation::ReputationConfig;
pub use server::ServerConfig;
pub use webhook::WebhookConfig;
pub use worker::QueueConfig;

use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Lookup of a single configuration variable by name
pub type Source<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub worker: QueueConfig,
    pub reputation: ReputationConfig,
    pub webhook: WebhookConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(&|name| env::var(name).ok())
    }

    /// Load configuration from any variable lookup
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        let config = Config {
            server: ServerConfig::from_source(source)?,
            database: DatabaseConfig::from_source(source)?,
            worker: QueueConfig::from_source(source)?,
            reputation: ReputationConfig::from_source(source)?,
            webhook: WebhookConfig::from_source(source)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        self.server
            .validate()
            .and_then(|_| self.database.validate())
            .and_then(|_| self.worker.validate())
            .and_then(|_| self.reputation.validate())
            .and_then(|_| self.webhook.validate())
            .map_err(AppError::Configuration)
    }
}

/// Parse an optional variable, falling back to `default` when it is unset
pub(crate) fn parse_var<T: FromStr>(source: Source<'_>, name: &str, default: T) -> AppResult<T> {
    match source(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", name))),
        None => Ok(default),
    }
}
