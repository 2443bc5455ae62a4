use crate::checker::{FindingKind, FindingMap, Report};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// A deduplicated URI
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Link {
    pub id: i64,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

/// One evaluation of one link
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Check {
    pub id: i64,
    pub link_id: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub link_errors: Json<FindingMap>,
    pub link_warnings: Json<FindingMap>,
    pub problem_summary: Option<String>,
    pub suggested_fix: Option<String>,
}

impl Check {
    /// A fresh, unscheduled check
    pub fn pending(id: i64, link_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            link_id,
            created_at,
            started_at: None,
            completed_at: None,
            link_errors: Json(FindingMap::new()),
            link_warnings: Json(FindingMap::new()),
            problem_summary: None,
            suggested_fix: None,
        }
    }

    /// True until the execution contract has touched the check
    pub fn requires_checking(&self) -> bool {
        self.started_at.is_none() && self.completed_at.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn status(&self) -> CheckStatus {
        if !self.is_complete() {
            CheckStatus::Pending
        } else if !self.link_errors.is_empty() {
            CheckStatus::Broken
        } else if !self.link_warnings.is_empty() {
            CheckStatus::Caution
        } else {
            CheckStatus::Ok
        }
    }

    /// Apply a terminal update, as the store does
    pub fn apply(&mut self, outcome: &CheckOutcome) {
        self.link_errors = Json(outcome.link_errors.clone());
        self.link_warnings = Json(outcome.link_warnings.clone());
        self.problem_summary = outcome.problem_summary.clone();
        self.suggested_fix = outcome.suggested_fix.clone();
        self.completed_at = Some(outcome.completed_at);
    }
}

/// Check joined with the URI it evaluated
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct LinkCheck {
    pub uri: String,
    #[sqlx(flatten)]
    pub check: Check,
}

impl LinkCheck {
    pub fn to_report(&self) -> LinkReport {
        LinkReport {
            uri: self.uri.clone(),
            status: self.check.status(),
            checked: self.check.completed_at,
            errors: self.check.link_errors.0.clone(),
            warnings: self.check.link_warnings.0.clone(),
        }
    }
}

/// A group of checks submitted together
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Batch {
    pub id: i64,
    pub webhook_uri: Option<String>,
    pub webhook_triggered: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Ok,
    Caution,
    Broken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
}

/// The single terminal update written to a check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub link_errors: FindingMap,
    pub link_warnings: FindingMap,
    pub problem_summary: Option<String>,
    pub suggested_fix: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CheckOutcome {
    pub fn from_report(report: &Report, completed_at: DateTime<Utc>) -> Self {
        Self {
            link_errors: report.errors.clone(),
            link_warnings: report.warnings.clone(),
            problem_summary: report.problem_summary(),
            suggested_fix: report.suggested_fix(),
            completed_at,
        }
    }

    /// Reuse the result of another, recent check of the same link
    pub fn adopted_from(other: &Check, completed_at: DateTime<Utc>) -> Self {
        Self {
            link_errors: other.link_errors.0.clone(),
            link_warnings: other.link_warnings.0.clone(),
            problem_summary: other.problem_summary.clone(),
            suggested_fix: other.suggested_fix.clone(),
            completed_at,
        }
    }

    /// Written when the job transport gives up on a check
    pub fn exhausted(completed_at: DateTime<Utc>) -> Self {
        let mut link_warnings = FindingMap::new();
        link_warnings.insert(
            FindingKind::CheckIncomplete,
            vec!["Could not complete the check.".to_string()],
        );

        Self {
            link_errors: FindingMap::new(),
            link_warnings,
            problem_summary: Some("Check failed".to_string()),
            suggested_fix: Some("Speak to your system administrator.".to_string()),
            completed_at,
        }
    }
}

/// Whether a link needs a new check given its newest one.
///
/// A newest check that has not started yet is already queued, so it is never
/// duplicated. Without a window any existing check is good enough.
pub fn needs_checking(
    latest: Option<&Check>,
    checked_within: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let Some(latest) = latest else {
        return true;
    };

    match (checked_within, latest.started_at) {
        (Some(window), Some(started_at)) => started_at < now - window,
        _ => false,
    }
}

/// Rendered state of one link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub uri: String,
    pub status: CheckStatus,
    pub checked: Option<DateTime<Utc>>,
    pub errors: FindingMap,
    pub warnings: FindingMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub links: usize,
    pub ok: usize,
    pub caution: usize,
    pub broken: usize,
    pub pending: usize,
}

/// Rendered state of a batch, also the webhook payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: i64,
    pub status: BatchStatus,
    pub links: Vec<LinkReport>,
    pub totals: BatchTotals,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Request to check a batch of links
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, max = 5000, message = "Must contain between 1 and 5000 uris"))]
    pub uris: Vec<String>,

    /// Reuse results checked within this many seconds
    pub checked_within: Option<u64>,

    #[validate(url(message = "Must be a valid URL"))]
    pub webhook_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_at(
        started: Option<DateTime<Utc>>,
        completed: Option<DateTime<Utc>>,
    ) -> Check {
        let mut check = Check::pending(1, 1, Utc::now());
        check.started_at = started;
        check.completed_at = completed;
        check
    }

    #[test]
    fn test_status_derivation_is_total() {
        let now = Utc::now();
        let mut errors = FindingMap::new();
        errors.insert(FindingKind::Timeout, vec!["t".to_string()]);
        let mut warnings = FindingMap::new();
        warnings.insert(FindingKind::RiskyTld, vec!["w".to_string()]);

        for started in [None, Some(now)] {
            for completed in [None, Some(now)] {
                for has_errors in [false, true] {
                    for has_warnings in [false, true] {
                        let mut check = check_at(started, completed);
                        if has_errors {
                            check.link_errors = Json(errors.clone());
                        }
                        if has_warnings {
                            check.link_warnings = Json(warnings.clone());
                        }

                        let expected = match (completed.is_some(), has_errors, has_warnings) {
                            (false, _, _) => CheckStatus::Pending,
                            (true, true, _) => CheckStatus::Broken,
                            (true, false, true) => CheckStatus::Caution,
                            (true, false, false) => CheckStatus::Ok,
                        };
                        assert_eq!(check.status(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_requires_checking() {
        let now = Utc::now();
        assert!(check_at(None, None).requires_checking());
        assert!(!check_at(Some(now), None).requires_checking());
        assert!(!check_at(Some(now), Some(now)).requires_checking());
        assert!(!check_at(None, Some(now)).requires_checking());
    }

    #[test]
    fn test_needs_checking() {
        let now = Utc::now();
        let window = Some(Duration::minutes(10));

        assert!(needs_checking(None, window, now));

        let recent = check_at(Some(now - Duration::minutes(1)), Some(now));
        assert!(!needs_checking(Some(&recent), window, now));
        assert!(!needs_checking(Some(&recent), None, now));

        let stale = check_at(Some(now - Duration::hours(1)), Some(now - Duration::hours(1)));
        assert!(needs_checking(Some(&stale), window, now));
        assert!(!needs_checking(Some(&stale), None, now));

        let queued = check_at(None, None);
        assert!(!needs_checking(Some(&queued), window, now));
    }

    #[test]
    fn test_exhausted_outcome_is_caution() {
        let now = Utc::now();
        let mut check = check_at(Some(now), None);
        check.apply(&CheckOutcome::exhausted(now));

        assert_eq!(check.status(), CheckStatus::Caution);
        assert!(check.link_errors.is_empty());
        assert_eq!(check.problem_summary.as_deref(), Some("Check failed"));
    }

    #[test]
    fn test_link_report_shape() {
        let now = Utc::now();
        let entry = LinkCheck {
            uri: "http://example.com/a".to_string(),
            check: check_at(Some(now), Some(now)),
        };

        let json = serde_json::to_value(entry.to_report()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 5);
        for key in ["uri", "status", "checked", "errors", "warnings"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(json["status"], "ok");
    }

    #[test]
    fn test_batch_request_validation() {
        let empty = CreateBatchRequest {
            uris: vec![],
            checked_within: None,
            webhook_uri: None,
        };
        assert!(empty.validate().is_err());

        let bad_hook = CreateBatchRequest {
            uris: vec!["http://example.com".to_string()],
            checked_within: None,
            webhook_uri: Some("not a url".to_string()),
        };
        assert!(bad_hook.validate().is_err());

        let ok = CreateBatchRequest {
            uris: vec!["http://example.com".to_string()],
            checked_within: Some(600),
            webhook_uri: Some("http://my-host.com/hook".to_string()),
        };
        assert!(ok.validate().is_ok());
    }
}
