//! Findings and the report they accumulate into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a single finding.
///
/// Declaration order doubles as priority: the first kind present in a report
/// (errors before warnings) provides its problem summary and suggested fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    UriInvalid,
    NoScheme,
    UnsupportedScheme,
    NoHost,
    LocalFile,
    TooManyRedirects,
    CyclicRedirects,
    CantConnect,
    Timeout,
    SslConfiguration,
    UnknownHttpError,
    HttpClientError,
    HttpServerError,
    GoogleSafebrowsing,
    MetaRating,
    RiskyTld,
    CredentialsInUri,
    MultipleRedirects,
    #[serde(rename = "http_non_200")]
    HttpNon200,
    SlowResponse,
    CheckIncomplete,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::UriInvalid => "uri_invalid",
            FindingKind::NoScheme => "no_scheme",
            FindingKind::UnsupportedScheme => "unsupported_scheme",
            FindingKind::NoHost => "no_host",
            FindingKind::LocalFile => "local_file",
            FindingKind::TooManyRedirects => "too_many_redirects",
            FindingKind::CyclicRedirects => "cyclic_redirects",
            FindingKind::CantConnect => "cant_connect",
            FindingKind::Timeout => "timeout",
            FindingKind::SslConfiguration => "ssl_configuration",
            FindingKind::UnknownHttpError => "unknown_http_error",
            FindingKind::HttpClientError => "http_client_error",
            FindingKind::HttpServerError => "http_server_error",
            FindingKind::GoogleSafebrowsing => "google_safebrowsing",
            FindingKind::MetaRating => "meta_rating",
            FindingKind::RiskyTld => "risky_tld",
            FindingKind::CredentialsInUri => "credentials_in_uri",
            FindingKind::MultipleRedirects => "multiple_redirects",
            FindingKind::HttpNon200 => "http_non_200",
            FindingKind::SlowResponse => "slow_response",
            FindingKind::CheckIncomplete => "check_incomplete",
        }
    }

    /// Short title shown as the problem summary.
    pub fn title(&self) -> &'static str {
        match self {
            FindingKind::UriInvalid => "Invalid URI",
            FindingKind::NoScheme => "No scheme given",
            FindingKind::UnsupportedScheme => "Unsupported scheme",
            FindingKind::NoHost => "No host given",
            FindingKind::LocalFile => "Local file",
            FindingKind::TooManyRedirects => "Too many redirects",
            FindingKind::CyclicRedirects => "Has a cyclic redirect",
            FindingKind::CantConnect => "Connection failed",
            FindingKind::Timeout => "Timeout Error",
            FindingKind::SslConfiguration => "SSL Error",
            FindingKind::UnknownHttpError => "Unknown HTTP error",
            FindingKind::HttpClientError => "Received 4xx response",
            FindingKind::HttpServerError => "Received 5xx response",
            FindingKind::GoogleSafebrowsing => "Possible threat",
            FindingKind::MetaRating => "Mature Rating",
            FindingKind::RiskyTld => "Risky TLD",
            FindingKind::CredentialsInUri => "Credentials in URI",
            FindingKind::MultipleRedirects => "Multiple redirects",
            FindingKind::HttpNon200 => "Non 200 response",
            FindingKind::SlowResponse => "Slow response time",
            FindingKind::CheckIncomplete => "Check failed",
        }
    }

    pub fn suggested_fix(&self) -> &'static str {
        match self {
            FindingKind::UriInvalid => "Check the link is typed correctly.",
            FindingKind::NoScheme => "Add a scheme to the link, for example 'https://'.",
            FindingKind::UnsupportedScheme => "Check the link works in a browser.",
            FindingKind::NoHost => "Add the website's address to the link.",
            FindingKind::LocalFile => "Upload the file somewhere public and link to that instead.",
            FindingKind::TooManyRedirects | FindingKind::MultipleRedirects => {
                "Link straight to the page the redirects end up on."
            }
            FindingKind::CyclicRedirects => "Find where the page has moved to and link there.",
            FindingKind::CantConnect | FindingKind::Timeout => {
                "Check the site is up, or remove the link."
            }
            FindingKind::SslConfiguration => "Contact the site owner about their certificate.",
            FindingKind::UnknownHttpError => "Check the link works in a browser.",
            FindingKind::HttpClientError => "Find where the page has moved to, or remove the link.",
            FindingKind::HttpServerError => "Try again later or contact the site owner.",
            FindingKind::GoogleSafebrowsing => "Remove the link.",
            FindingKind::MetaRating => "Check the page is suitable for your users.",
            FindingKind::RiskyTld => "Check the site is what you expect.",
            FindingKind::CredentialsInUri => "Remove the username and password from the link.",
            FindingKind::HttpNon200 => "Check the page loads as expected.",
            FindingKind::SlowResponse => "Check the page loads in a reasonable time.",
            FindingKind::CheckIncomplete => "Speak to your system administrator.",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages grouped by finding kind.
pub type FindingMap = BTreeMap<FindingKind, Vec<String>>;

/// Errors and warnings accumulated while checking one URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub errors: FindingMap,
    pub warnings: FindingMap,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, kind: FindingKind, message: impl Into<String>) {
        self.errors.entry(kind).or_default().push(message.into());
    }

    pub fn add_warning(&mut self, kind: FindingKind, message: impl Into<String>) {
        self.warnings.entry(kind).or_default().push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Folds a redirect target's report into this one.
    ///
    /// Messages are appended per kind without de-duplication, so a chain that
    /// hits the same problem on several hops keeps every occurrence.
    pub fn merge(&mut self, other: Report) {
        for (kind, messages) in other.errors {
            self.errors.entry(kind).or_default().extend(messages);
        }
        for (kind, messages) in other.warnings {
            self.warnings.entry(kind).or_default().extend(messages);
        }
    }

    fn leading_kind(&self) -> Option<FindingKind> {
        self.errors
            .keys()
            .next()
            .or_else(|| self.warnings.keys().next())
            .copied()
    }

    pub fn problem_summary(&self) -> Option<String> {
        self.leading_kind().map(|kind| kind.title().to_string())
    }

    pub fn suggested_fix(&self) -> Option<String> {
        self.leading_kind().map(|kind| kind.suggested_fix().to_string())
    }
}
