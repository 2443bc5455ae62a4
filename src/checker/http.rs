//! HTTP(S) link checking, including explicit redirect following.
//!
//! Stages run in a fixed order and stop as soon as an error is recorded;
//! warnings never stop the pipeline:
//!
//! 1. redirect bookkeeping against the incoming history
//! 2. risky top-level domain
//! 3. credentials in the URI
//! 4. HEAD probe (timing, status, redirect recursion)
//! 5. GET probe for HTML pages (meta rating)
//! 6. reputation lookup

use super::client::{ProbeError, ProbeResponse, REQUEST_TIMEOUT};
use super::html::{is_mature_rating, meta_rating};
use super::report::{FindingKind, Report};
use super::UriChecker;
use crate::error::{AppError, AppResult};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error};
use url::Url;

pub const RISKY_TLDS: [&str; 7] = ["xxx", "adult", "dating", "porn", "sex", "sexy", "singles"];
pub const REDIRECT_STATUS_CODES: [u16; 5] = [301, 302, 303, 307, 308];
pub const REDIRECT_LIMIT: usize = 8;
pub const REDIRECT_WARNING: usize = 2;
/// Absolute bound on chain length, independent of `REDIRECT_LIMIT`.
pub const MAX_CHAIN_DEPTH: usize = 16;
pub const SLOW_RESPONSE: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy)]
enum Probe {
    Head,
    Get,
}

pub(crate) struct HttpChecker<'a> {
    checker: &'a UriChecker,
    uri: Url,
    redirect_history: Vec<Url>,
    report: Report,
}

impl<'a> HttpChecker<'a> {
    pub(crate) fn new(checker: &'a UriChecker, uri: Url, redirect_history: Vec<Url>) -> Self {
        Self {
            checker,
            uri,
            redirect_history,
            report: Report::new(),
        }
    }

    pub(crate) async fn call(mut self) -> AppResult<Report> {
        if self.uri.host_str().map_or(true, str::is_empty) {
            self.report
                .add_error(FindingKind::NoHost, "Your link has no hostname.");
            return Ok(self.report);
        }

        self.check_redirects();
        if self.report.has_errors() {
            return Ok(self.report);
        }

        self.check_top_level_domain();
        self.check_credentials();

        let head_response = self.check_head_request().await?;
        if self.report.has_errors() {
            return Ok(self.report);
        }

        if head_response.as_ref().is_some_and(ProbeResponse::is_html) {
            self.check_get_request().await?;
            if self.report.has_errors() {
                return Ok(self.report);
            }
        }

        self.check_reputation().await;

        Ok(self.report)
    }

    fn check_redirects(&mut self) {
        let hops = self.redirect_history.len();

        if hops >= REDIRECT_LIMIT {
            self.report.add_error(
                FindingKind::TooManyRedirects,
                "Too many redirects. The page won't load for users.",
            );
        }
        if self.redirect_history.contains(&self.uri) {
            self.report.add_error(
                FindingKind::CyclicRedirects,
                "Has a cyclic redirect. This will make the user's browser crash.",
            );
        }
        if hops == REDIRECT_WARNING {
            self.report.add_warning(
                FindingKind::MultipleRedirects,
                "Multiple redirects. This page has moved several times - find out where it is now and send users straight there.",
            );
        }
    }

    fn check_top_level_domain(&mut self) {
        let Some(host) = self.uri.host_str() else {
            return;
        };
        let tld = host.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();

        if RISKY_TLDS.contains(&tld.as_str()) {
            self.report.add_warning(
                FindingKind::RiskyTld,
                format!("Potentially suspicious top level domain. It contains the word {tld}."),
            );
        }
    }

    fn check_credentials(&mut self) {
        let has_password = self.uri.password().is_some_and(|p| !p.is_empty());
        if !self.uri.username().is_empty() || has_password {
            self.report.add_warning(
                FindingKind::CredentialsInUri,
                "Credentials in URI - there's a username or password in this link.",
            );
        }
    }

    async fn check_head_request(&mut self) -> AppResult<Option<ProbeResponse>> {
        let started = Instant::now();
        let outcome = self.probe(Probe::Head).await;
        let elapsed = started.elapsed();

        if elapsed > SLOW_RESPONSE {
            self.report.add_warning(
                FindingKind::SlowResponse,
                "Slow response time. The page loads slowly.",
            );
        }

        let response = match outcome {
            Ok(response) => response,
            Err(failure) => {
                self.record_failure(failure)?;
                return Ok(None);
            }
        };

        let status = response.status;
        if (400..500).contains(&status) {
            self.report.add_error(
                FindingKind::HttpClientError,
                "Received 4xx response. This page doesn't exist any more.",
            );
        } else if (500..600).contains(&status) {
            self.report.add_error(
                FindingKind::HttpServerError,
                "Received 5xx response. There's a problem with the server this page is hosted on.",
            );
        } else if status != 200 && !REDIRECT_STATUS_CODES.contains(&status) {
            self.report
                .add_warning(FindingKind::HttpNon200, "Page not available.");
        }

        if REDIRECT_STATUS_CODES.contains(&status) && !self.report.has_errors() {
            if let Some(location) = response.location.as_deref() {
                self.follow_redirect(location).await?;
            }
        }

        Ok(Some(response))
    }

    async fn follow_redirect(&mut self, location: &str) -> AppResult<()> {
        // An unresolvable target is passed through raw so the dispatcher can
        // report what is wrong with it.
        let target = self
            .uri
            .join(location)
            .map(String::from)
            .unwrap_or_else(|_| location.to_string());

        let mut history = self.redirect_history.clone();
        history.push(self.uri.clone());

        if history.len() > MAX_CHAIN_DEPTH {
            self.report.add_error(
                FindingKind::TooManyRedirects,
                "Too many redirects. The page won't load for users.",
            );
            return Ok(());
        }

        debug!(from = %self.uri, to = %target, hops = history.len(), "Following redirect");
        let subreport = self.checker.follow(target, history).await?;
        self.report.merge(subreport);

        Ok(())
    }

    async fn check_get_request(&mut self) -> AppResult<()> {
        let response = match self.probe(Probe::Get).await {
            Ok(response) => response,
            Err(failure) => return self.record_failure(failure),
        };

        if let Some(rating) = meta_rating(&response.body) {
            if is_mature_rating(&rating) {
                self.report.add_warning(
                    FindingKind::MetaRating,
                    format!(
                        "Page suggests it contains mature content. It describes itself as '{rating}'."
                    ),
                );
            }
        }

        Ok(())
    }

    async fn check_reputation(&mut self) {
        let outcome = timeout(REQUEST_TIMEOUT, self.checker.reputation.is_threat(&self.uri)).await;

        match outcome {
            Ok(Ok(true)) => {
                self.report.add_warning(
                    FindingKind::GoogleSafebrowsing,
                    "Google Safebrowsing has detected a threat.",
                );
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                error!(uri = %self.uri, error = %e, "Unable to talk to the reputation service");
            }
            Err(_) => {
                error!(uri = %self.uri, "Reputation lookup timed out");
            }
        }
    }

    /// Issues one request, bounded by `REQUEST_TIMEOUT` whatever the client does.
    async fn probe(&self, probe: Probe) -> Result<ProbeResponse, ProbeError> {
        let client = &self.checker.client;
        let request = async {
            match probe {
                Probe::Head => client.head(&self.uri).await,
                Probe::Get => client.get(&self.uri).await,
            }
        };

        match timeout(REQUEST_TIMEOUT, request).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout),
        }
    }

    fn record_failure(&mut self, failure: ProbeError) -> AppResult<()> {
        match failure {
            ProbeError::Connect => self.report.add_error(
                FindingKind::CantConnect,
                "Connection failed - this link won't work.",
            ),
            ProbeError::Timeout => self
                .report
                .add_error(FindingKind::Timeout, "Timeout Error - this link won't work."),
            ProbeError::Tls => self.report.add_error(
                FindingKind::SslConfiguration,
                "SSL Error - this site isn't secure.",
            ),
            ProbeError::Transport(class) => {
                self.report.add_error(FindingKind::UnknownHttpError, class)
            }
            ProbeError::Fatal(reason) => {
                return Err(AppError::Internal(format!(
                    "Request to {} failed: {}",
                    self.uri, reason
                )));
            }
        }
        Ok(())
    }
}
