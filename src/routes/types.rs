use serde::{Deserialize, Serialize};

/// Query parameters of `GET /check-link`
#[derive(Debug, Deserialize)]
pub struct CheckLinkQuery {
    pub uri: Option<String>,

    /// Seconds within which an earlier result is good enough
    #[serde(rename = "checked-within")]
    pub checked_within: Option<u64>,

    #[serde(default)]
    pub synchronous: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Individual health status
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub latency_ms: Option<u64>,
}
