//! Link checking.
//!
//! `UriChecker` parses a raw link, decides which scheme checker handles it and
//! always hands back a `Report`. Structural and network problems become
//! findings; only failures that say nothing about the link itself (a request
//! that cannot be built) surface as `Err`, so the job layer can retry them.

mod client;
mod file;
mod html;
mod http;
pub mod report;

pub use client::{
    classify_error, HttpClient, ProbeError, ProbeResponse, ReqwestClient, REQUEST_TIMEOUT,
};
pub use html::{is_mature_rating, meta_rating};
pub use http::{
    MAX_CHAIN_DEPTH, REDIRECT_LIMIT, REDIRECT_STATUS_CODES, REDIRECT_WARNING, RISKY_TLDS,
    SLOW_RESPONSE,
};
pub use report::{FindingKind, FindingMap, Report};

#[cfg(test)]
pub use client::MockHttpClient;

use crate::error::AppResult;
use crate::reputation::ReputationLookup;
use file::FileChecker;
use http::HttpChecker;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::{ParseError, Url};

/// Future of a nested check. Boxed so redirect recursion has a finite type.
pub type BoxedCheck<'a> = Pin<Box<dyn Future<Output = AppResult<Report>> + Send + 'a>>;

/// Entry point for checking a single link.
#[derive(Clone)]
pub struct UriChecker {
    client: Arc<dyn HttpClient>,
    reputation: Arc<dyn ReputationLookup>,
}

impl UriChecker {
    pub fn new(client: Arc<dyn HttpClient>, reputation: Arc<dyn ReputationLookup>) -> Self {
        Self { client, reputation }
    }

    /// Check a link from scratch.
    pub async fn check(&self, raw: &str) -> AppResult<Report> {
        self.check_with_history(raw, Vec::new()).await
    }

    /// Check a link reached through the redirects in `history`.
    pub async fn check_with_history(&self, raw: &str, history: Vec<Url>) -> AppResult<Report> {
        let uri = match parse_uri(raw) {
            Ok(uri) => uri,
            Err(report) => return Ok(report),
        };

        match uri.scheme() {
            "http" | "https" => HttpChecker::new(self, uri, history).call().await,
            "file" => Ok(FileChecker.call()),
            _ => {
                let mut report = Report::new();
                report.add_warning(
                    FindingKind::UnsupportedScheme,
                    "Unsupported scheme - we can't check this type of link.",
                );
                Ok(report)
            }
        }
    }

    pub(crate) fn follow(&self, target: String, history: Vec<Url>) -> BoxedCheck<'_> {
        Box::pin(async move { self.check_with_history(&target, history).await })
    }
}

/// Parses a link, turning every structural failure into a terminal report.
fn parse_uri(raw: &str) -> Result<Url, Report> {
    let mut report = Report::new();

    match Url::parse(raw) {
        Ok(uri) => return Ok(uri),
        Err(ParseError::RelativeUrlWithoutBase) if !has_illegal_chars(raw) => {
            report.add_warning(
                FindingKind::NoScheme,
                "No scheme given, for example 'http://'.",
            );
        }
        Err(ParseError::EmptyHost) if has_http_scheme(raw) => {
            report.add_error(FindingKind::NoHost, "Your link has no hostname.");
        }
        Err(_) => {
            report.add_error(FindingKind::UriInvalid, "Not a valid URI or URL.");
        }
    }

    Err(report)
}

fn has_illegal_chars(raw: &str) -> bool {
    raw.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn has_http_scheme(raw: &str) -> bool {
    raw.split_once(':')
        .map(|(scheme, _)| {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        })
        .unwrap_or(false)
}
