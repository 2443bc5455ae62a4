//! Batch aggregation.
//!
//! Everything here is derived from the member checks on demand; nothing is
//! cached, so a batch can be re-rendered at any time.

use crate::models::{Batch, BatchReport, BatchStatus, BatchTotals, Check, CheckStatus, LinkCheck};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub status: BatchStatus,
    pub totals: BatchTotals,
    /// Latest member end time, only set once every member has ended
    pub ended_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn from_checks<'a>(checks: impl IntoIterator<Item = &'a Check>) -> Self {
        let mut totals = BatchTotals::default();
        let mut latest_end: Option<DateTime<Utc>> = None;
        let mut all_ended = true;

        for check in checks {
            totals.links += 1;
            match check.status() {
                CheckStatus::Ok => totals.ok += 1,
                CheckStatus::Caution => totals.caution += 1,
                CheckStatus::Broken => totals.broken += 1,
                CheckStatus::Pending => totals.pending += 1,
            }

            match check.completed_at {
                Some(ended) => latest_end = latest_end.max(Some(ended)),
                None => all_ended = false,
            }
        }

        let status = if all_ended {
            BatchStatus::Completed
        } else {
            BatchStatus::InProgress
        };

        Self {
            status,
            totals,
            ended_at: if all_ended { latest_end } else { None },
        }
    }
}

/// Render a batch with its members in submission order.
pub fn render_batch(batch: &Batch, members: &[LinkCheck]) -> BatchReport {
    let summary = BatchSummary::from_checks(members.iter().map(|m| &m.check));

    BatchReport {
        id: batch.id,
        status: summary.status,
        links: members.iter().map(LinkCheck::to_report).collect(),
        totals: summary.totals,
        completed_at: summary.ended_at,
    }
}
