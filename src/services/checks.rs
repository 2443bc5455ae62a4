use crate::batch::render_batch;
use crate::error::{AppError, AppResult};
use crate::jobs::{CheckJob, JobSender};
use crate::models::{needs_checking, BatchReport, BatchStatus, LinkReport};
use crate::runner::CheckRunner;
use crate::store::CheckStore;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of submitting a batch
#[derive(Debug, Clone)]
pub struct BatchCreated {
    pub report: BatchReport,
}

impl BatchCreated {
    pub fn is_completed(&self) -> bool {
        self.report.status == BatchStatus::Completed
    }
}

/// Service behind the link and batch endpoints.
///
/// Decides which links need a new check, creates and schedules those checks
/// and renders what is currently known.
#[derive(Clone)]
pub struct CheckService {
    store: Arc<dyn CheckStore>,
    runner: CheckRunner,
    jobs: JobSender,
}

impl CheckService {
    pub fn new(store: Arc<dyn CheckStore>, runner: CheckRunner, jobs: JobSender) -> Self {
        Self {
            store,
            runner,
            jobs,
        }
    }

    /// Report on a single link, checking it if there is no usable result.
    ///
    /// # Arguments
    ///
    /// * `uri` - The link as submitted
    /// * `checked_within` - Results started within this window are reused
    /// * `synchronous` - Run the pending check before answering
    ///
    /// # Returns
    ///
    /// The state of the newest check of the link, `pending` while it runs.
    pub async fn check_link(
        &self,
        uri: &str,
        checked_within: Option<Duration>,
        synchronous: bool,
    ) -> AppResult<LinkReport> {
        let link = self.store.find_or_create_link(uri).await?;
        let latest = self.store.latest_check_for_link(link.id).await?;

        let check = if needs_checking(latest.as_ref(), checked_within, Utc::now()) {
            let check = self.store.create_check(link.id).await?;
            info!(check_id = check.id, uri, "Created check");
            if !synchronous {
                self.jobs.enqueue_check(check.id, checked_within);
            }
            check
        } else {
            latest.ok_or_else(|| AppError::Internal(format!("Link {} has no check", link.id)))?
        };

        if synchronous && check.requires_checking() {
            let job = CheckJob {
                check_id: check.id,
                checked_within,
            };
            if let Err(e) = self.runner.perform(&job).await {
                warn!(check_id = check.id, "Inline check failed, queueing it: {}", e);
                self.jobs.enqueue_check(check.id, checked_within);
            }
        }

        let entry = self
            .store
            .get_check(check.id)
            .await?
            .ok_or(AppError::CheckNotFound(check.id))?;

        Ok(entry.to_report())
    }

    /// Create a batch over the given links and schedule what needs checking.
    ///
    /// Duplicate URIs collapse into one member. A batch whose members are all
    /// already complete fires its webhook straight away.
    pub async fn create_batch(
        &self,
        uris: &[String],
        checked_within: Option<Duration>,
        webhook_uri: Option<&str>,
    ) -> AppResult<BatchCreated> {
        if uris.is_empty() {
            return Err(AppError::InvalidRequest(
                "At least one uri is required".to_string(),
            ));
        }

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut check_ids = Vec::with_capacity(uris.len());
        let mut scheduled = Vec::new();

        for uri in uris.iter().filter(|uri| seen.insert(uri.as_str())) {
            let link = self.store.find_or_create_link(uri).await?;
            let latest = self.store.latest_check_for_link(link.id).await?;

            let check_id = match latest {
                Some(check) if !needs_checking(Some(&check), checked_within, now) => check.id,
                _ => {
                    let check = self.store.create_check(link.id).await?;
                    scheduled.push(check.id);
                    check.id
                }
            };
            check_ids.push(check_id);
        }

        let batch = self.store.create_batch(&check_ids, webhook_uri).await?;
        info!(
            batch_id = batch.id,
            links = check_ids.len(),
            scheduled = scheduled.len(),
            "Created batch"
        );

        // Enqueue only once the batch exists so completions see it
        for check_id in scheduled {
            self.jobs.enqueue_check(check_id, checked_within);
        }

        let members = self.store.batch_members(batch.id).await?;
        let report = render_batch(&batch, &members);
        if report.status == BatchStatus::Completed {
            self.runner.trigger_batch(&batch).await?;
        }

        Ok(BatchCreated { report })
    }

    /// Render a batch by id
    pub async fn get_batch(&self, batch_id: i64) -> AppResult<BatchReport> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or(AppError::BatchNotFound(batch_id))?;
        let members = self.store.batch_members(batch.id).await?;

        Ok(render_batch(&batch, &members))
    }
}
