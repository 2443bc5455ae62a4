//! Threat-intelligence lookups for checked URIs.
//!
//! A failed lookup is never a finding: the checker logs it and moves on, so an
//! outage of the reputation service cannot mislabel or block a link.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const SAFE_BROWSING_ENDPOINT: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";

static THREAT_TYPES: [&str; 5] = [
    "THREAT_TYPE_UNSPECIFIED",
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("reputation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("reputation service returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    /// Whether the URI matches a known threat.
    async fn is_threat(&self, uri: &Url) -> Result<bool, ReputationError>;
}

/// Used when no API key is configured.
pub struct DisabledReputation;

#[async_trait]
impl ReputationLookup for DisabledReputation {
    async fn is_threat(&self, _uri: &Url) -> Result<bool, ReputationError> {
        Ok(false)
    }
}

/// Google Safe Browsing v4 lookup.
pub struct SafeBrowsingClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SafeBrowsingClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ReputationError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: SAFE_BROWSING_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    client: ClientInfo,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo {
    client_id: &'static str,
    client_version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'static [&'static str],
    platform_types: [&'static str; 1],
    threat_entry_types: [&'static str; 1],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct FindResponse {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

fn find_request(uri: &Url) -> FindRequest<'_> {
    FindRequest {
        client: ClientInfo {
            client_id: "link-checker-api",
            client_version: env!("CARGO_PKG_VERSION"),
        },
        threat_info: ThreatInfo {
            threat_types: &THREAT_TYPES,
            platform_types: ["ANY_PLATFORM"],
            threat_entry_types: ["URL"],
            threat_entries: [ThreatEntry { url: uri.as_str() }],
        },
    }
}

#[async_trait]
impl ReputationLookup for SafeBrowsingClient {
    async fn is_threat(&self, uri: &Url) -> Result<bool, ReputationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&find_request(uri))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReputationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let found: FindResponse = response.json().await?;
        Ok(!found.matches.is_empty())
    }
}
