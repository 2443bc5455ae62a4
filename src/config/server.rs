use super::{parse_var, Source};
use crate::error::AppResult;
use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "127.0.0.1")
    pub host: String,

    /// Port number to bind to (e.g., 3000)
    pub port: u16,

    /// List of allowed origins for CORS (use ["*"] for all origins)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_source(source: Source<'_>) -> AppResult<Self> {
        let host = source("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_var(source, "SERVER_PORT", 3000)?;

        let origins = source("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());
        let allowed_origins = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_origins.is_empty() {
            return Err("ALLOWED_ORIGINS must name at least one origin".to_string());
        }

        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
