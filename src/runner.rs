//! Check execution.
//!
//! `CheckRunner` is what the job worker (and synchronous requests) call to
//! move a check to its terminal state. Every path that ends a check, or finds
//! it already ended, re-evaluates the webhooks of the batches it belongs to.

use crate::batch::render_batch;
use crate::checker::UriChecker;
use crate::error::{AppError, AppResult};
use crate::jobs::{CheckJob, JobSender};
use crate::models::{Batch, CheckOutcome};
use crate::store::CheckStore;
use crate::util::window_start;
use crate::webhook::WebhookSender;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct CheckRunner {
    store: Arc<dyn CheckStore>,
    checker: UriChecker,
    webhook: Arc<dyn WebhookSender>,
}

impl CheckRunner {
    pub fn new(
        store: Arc<dyn CheckStore>,
        checker: UriChecker,
        webhook: Arc<dyn WebhookSender>,
    ) -> Self {
        Self {
            store,
            checker,
            webhook,
        }
    }

    /// Run one check to completion.
    ///
    /// Safe to call any number of times for the same check: once a check has
    /// started or ended it is never written again from here.
    pub async fn perform(&self, job: &CheckJob) -> AppResult<()> {
        let check_id = job.check_id;
        let entry = self
            .store
            .get_check(check_id)
            .await?
            .ok_or(AppError::CheckNotFound(check_id))?;

        if !entry.check.requires_checking() {
            debug!(check_id, "Check already handled, skipping");
            return self.trigger_callbacks(check_id).await;
        }

        if let Some(window) = job.checked_within {
            let since = window_start(Utc::now(), window);
            let fresh = self
                .store
                .fresh_check_for_link(entry.check.link_id, since, check_id)
                .await?;

            if let Some(fresh) = fresh {
                info!(check_id, fresh_check_id = fresh.id, "Reusing recent result");
                let outcome = CheckOutcome::adopted_from(&fresh, Utc::now());
                self.store.complete_check(check_id, &outcome).await?;
                return self.trigger_callbacks(check_id).await;
            }
        }

        if !self.store.mark_check_started(check_id, Utc::now()).await? {
            debug!(check_id, "Check claimed by another worker");
            return self.trigger_callbacks(check_id).await;
        }

        if let Err(e) = self.run_started(check_id, &entry.uri).await {
            // Let the retry start over
            if let Err(reset) = self.store.reset_check_start(check_id).await {
                error!(check_id, "Failed to clear check start: {}", reset);
            }
            return Err(e);
        }

        self.trigger_callbacks(check_id).await
    }

    /// Probe a check this runner has claimed and write its result
    async fn run_started(&self, check_id: i64, uri: &str) -> AppResult<()> {
        let report = self.checker.check(uri).await?;

        let outcome = CheckOutcome::from_report(&report, Utc::now());
        if self.store.complete_check(check_id, &outcome).await? {
            info!(
                check_id,
                uri,
                errors = report.errors.len(),
                warnings = report.warnings.len(),
                "Check completed"
            );
        }

        Ok(())
    }

    /// Queue every check left unfinished by a previous process.
    ///
    /// Only safe while no other worker shares the store.
    pub async fn requeue_unfinished(&self, jobs: &JobSender) -> AppResult<usize> {
        let ids = self.store.release_unfinished_checks().await?;
        for check_id in &ids {
            jobs.enqueue_check(*check_id, None);
        }

        if !ids.is_empty() {
            info!(count = ids.len(), "Requeued unfinished checks");
        }
        Ok(ids.len())
    }

    /// Force a check into a terminal state after its job ran out of attempts.
    pub async fn fail_exhausted(&self, check_id: i64) -> AppResult<()> {
        let outcome = CheckOutcome::exhausted(Utc::now());
        if self.store.complete_check(check_id, &outcome).await? {
            warn!(check_id, "Check marked incomplete after exhausting retries");
        }

        self.trigger_callbacks(check_id).await
    }

    /// Fire the webhook of every batch containing this check that is now complete
    pub async fn trigger_callbacks(&self, check_id: i64) -> AppResult<()> {
        for batch in self.store.batches_for_check(check_id).await? {
            self.trigger_batch(&batch).await?;
        }
        Ok(())
    }

    /// Fire the batch webhook if the batch is complete and nobody fired it yet.
    ///
    /// Returns whether this call delivered (or tried to deliver) the webhook.
    pub async fn trigger_batch(&self, batch: &Batch) -> AppResult<bool> {
        let Some(target) = batch.webhook_uri.as_deref() else {
            return Ok(false);
        };
        if batch.webhook_triggered {
            return Ok(false);
        }

        let members = self.store.batch_members(batch.id).await?;
        let report = render_batch(batch, &members);
        if report.completed_at.is_none() {
            return Ok(false);
        }

        if !self.store.claim_webhook(batch.id).await? {
            debug!(batch_id = batch.id, "Webhook already claimed");
            return Ok(false);
        }

        match self.webhook.deliver(target, &report).await {
            Ok(()) => info!(batch_id = batch.id, webhook_uri = target, "Webhook delivered"),
            Err(e) => error!(
                batch_id = batch.id,
                webhook_uri = target,
                "Webhook delivery failed: {}",
                e
            ),
        }

        Ok(true)
    }
}
