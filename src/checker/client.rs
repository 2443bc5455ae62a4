//! Outbound HTTP probing used by the checker.
//!
//! The checker follows redirects itself so it can inspect every hop, which
//! means any client plugged in here must hand 3xx responses back untouched.

use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, Method};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Hard bound on a single probe, covering both connect and the whole request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Only this much of an HTML page is read; the rating meta tag lives in `<head>`.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// What the checker needs to know about one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: String,
}

impl ProbeResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// True when the media type, ignoring parameters, is `text/html`.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(|media| media.trim().eq_ignore_ascii_case("text/html"))
            .unwrap_or(false)
    }
}

/// Why a probe produced no response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("connection failed")]
    Connect,

    #[error("request timed out")]
    Timeout,

    #[error("TLS handshake failed")]
    Tls,

    /// Any other transport failure, named by its class.
    #[error("{0}")]
    Transport(String),

    /// The request could not be issued at all. Not a property of the link.
    #[error("request could not be built: {0}")]
    Fatal(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;

    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Production client backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, ProbeError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT_ENCODING,
            header::HeaderValue::from_static("identity"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("link-checker-api/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProbeError::Fatal(e.to_string()))?;

        Ok(Self { client })
    }

    async fn probe(&self, method: Method, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let read_body = method == Method::GET;
        let response = self
            .client
            .request(method, url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let status = response.status().as_u16();
        let content_type = header_value(header::CONTENT_TYPE);
        let location = header_value(header::LOCATION);

        let body = if read_body {
            read_prefix(response, MAX_BODY_BYTES).await?
        } else {
            String::new()
        };

        Ok(ProbeResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

/// Read at most `limit` bytes of the body; the rest is never downloaded
async fn read_prefix(mut response: reqwest::Response, limit: usize) -> Result<String, ProbeError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
        if append_capped(&mut body, &chunk, limit) {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Append up to the cap and report whether the buffer is full
fn append_capped(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buffer.len());
    buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buffer.len() >= limit
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.probe(Method::HEAD, url).await
    }

    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.probe(Method::GET, url).await
    }
}

/// Maps a `reqwest` failure onto the categories the checker reports.
///
/// TLS failures surface as connect errors, so the source chain is inspected
/// before `is_connect` is trusted.
pub fn classify_error(error: reqwest::Error) -> ProbeError {
    if error.is_builder() {
        ProbeError::Fatal(error.to_string())
    } else if error.is_timeout() {
        ProbeError::Timeout
    } else if is_tls_failure(&error) {
        ProbeError::Tls
    } else if error.is_connect() {
        ProbeError::Connect
    } else if error.is_redirect() {
        ProbeError::Transport("RedirectError".to_string())
    } else if error.is_body() {
        ProbeError::Transport("BodyError".to_string())
    } else if error.is_decode() {
        ProbeError::Transport("DecodeError".to_string())
    } else if error.is_request() {
        ProbeError::Transport("RequestError".to_string())
    } else {
        ProbeError::Transport("HttpError".to_string())
    }
}

fn is_tls_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if mentions_tls(&cause.to_string()) {
            return true;
        }
        source = cause.source();
    }
    false
}

fn mentions_tls(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| text.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_ignores_parameters_and_case() {
        assert!(ProbeResponse::with_status(200)
            .content_type("text/html; charset=utf-8")
            .is_html());
        assert!(ProbeResponse::with_status(200).content_type("Text/HTML").is_html());
        assert!(!ProbeResponse::with_status(200).content_type("text/plain").is_html());
        assert!(!ProbeResponse::with_status(200).is_html());
    }

    #[test]
    fn test_mentions_tls() {
        assert!(mentions_tls("invalid peer certificate: UnknownIssuer"));
        assert!(mentions_tls("received fatal alert: HandshakeFailure"));
        assert!(!mentions_tls("connection refused"));
    }

    #[test]
    fn test_body_prefix_is_capped() {
        let mut body = Vec::new();

        assert!(!append_capped(&mut body, b"<html><head>", 16));
        assert!(append_capped(&mut body, b"<meta name=rating>", 16));
        assert_eq!(body, b"<html><head><met");

        assert!(append_capped(&mut body, b"</head>", 16));
        assert_eq!(body.len(), 16);
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestClient::new().is_ok());
    }
}
