use super::{parse_var, Source};
use crate::error::{AppError, AppResult};
use serde::Deserialize;

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of database connections in the pool
    pub max_connections: u32,

    /// Minimum number of database connections to maintain
    pub min_connections: u32,

    /// Timeout in seconds for acquiring a connection from the pool
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        Ok(Self {
            url: source("DATABASE_URL")
                .ok_or_else(|| AppError::MissingEnvVar("DATABASE_URL".to_string()))?,
            max_connections: parse_var(source, "DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_var(source, "DB_MIN_CONNECTIONS", 1)?,
            acquire_timeout_seconds: parse_var(source, "DB_ACQUIRE_TIMEOUT_SECONDS", 30)?,
        })
    }

    /// Validate database configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_connections > self.max_connections {
            return Err("DB_MIN_CONNECTIONS cannot be greater than DB_MAX_CONNECTIONS".to_string());
        }

        if self.acquire_timeout_seconds == 0 {
            return Err("DB_ACQUIRE_TIMEOUT_SECONDS must be greater than 0".to_string());
        }

        Ok(())
    }
}
