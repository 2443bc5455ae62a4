use super::CheckStore;
use crate::error::{AppError, AppResult};
use crate::models::{Batch, Check, CheckOutcome, Link, LinkCheck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Store kept in process memory.
///
/// Conditional updates take the entry's shard lock, so they are atomic in the
/// same way the SQL `UPDATE ... WHERE` statements are.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    links: DashMap<i64, Link>,
    link_ids: DashMap<String, i64>,
    checks: DashMap<i64, Check>,
    batches: DashMap<i64, Batch>,
    batch_checks: DashMap<i64, Vec<i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn link_check(&self, check: Check) -> AppResult<LinkCheck> {
        let uri = self
            .links
            .get(&check.link_id)
            .map(|link| link.uri.clone())
            .ok_or_else(|| AppError::Internal(format!("Check {} has no link", check.id)))?;

        Ok(LinkCheck { uri, check })
    }
}

#[async_trait]
impl CheckStore for MemoryStore {
    async fn find_or_create_link(&self, uri: &str) -> AppResult<Link> {
        let id = *self
            .link_ids
            .entry(uri.to_string())
            .or_insert_with(|| {
                let id = self.next_id();
                self.links.insert(
                    id,
                    Link {
                        id,
                        uri: uri.to_string(),
                        created_at: Utc::now(),
                    },
                );
                id
            });

        self.links
            .get(&id)
            .map(|link| link.clone())
            .ok_or_else(|| AppError::Internal(format!("Link {id} vanished")))
    }

    async fn latest_check_for_link(&self, link_id: i64) -> AppResult<Option<Check>> {
        Ok(self
            .checks
            .iter()
            .filter(|entry| entry.link_id == link_id)
            .max_by_key(|entry| entry.id)
            .map(|entry| entry.value().clone()))
    }

    async fn fresh_check_for_link(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        exclude: i64,
    ) -> AppResult<Option<Check>> {
        Ok(self
            .checks
            .iter()
            .filter(|entry| entry.link_id == link_id && entry.id != exclude)
            .filter(|entry| entry.completed_at.is_some_and(|ended| ended >= since))
            .max_by_key(|entry| entry.completed_at)
            .map(|entry| entry.value().clone()))
    }

    async fn create_check(&self, link_id: i64) -> AppResult<Check> {
        let check = Check::pending(self.next_id(), link_id, Utc::now());
        self.checks.insert(check.id, check.clone());
        Ok(check)
    }

    async fn get_check(&self, check_id: i64) -> AppResult<Option<LinkCheck>> {
        let check = self.checks.get(&check_id).map(|entry| entry.value().clone());
        check.map(|check| self.link_check(check)).transpose()
    }

    async fn mark_check_started(&self, check_id: i64, at: DateTime<Utc>) -> AppResult<bool> {
        let mut check = self
            .checks
            .get_mut(&check_id)
            .ok_or(AppError::CheckNotFound(check_id))?;

        if !check.requires_checking() {
            return Ok(false);
        }
        check.started_at = Some(at);
        Ok(true)
    }

    async fn reset_check_start(&self, check_id: i64) -> AppResult<()> {
        if let Some(mut check) = self.checks.get_mut(&check_id) {
            if !check.is_complete() {
                check.started_at = None;
            }
        }
        Ok(())
    }

    async fn release_unfinished_checks(&self) -> AppResult<Vec<i64>> {
        let mut ids = Vec::new();
        for mut check in self.checks.iter_mut() {
            if !check.is_complete() {
                check.started_at = None;
                ids.push(check.id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    async fn complete_check(&self, check_id: i64, outcome: &CheckOutcome) -> AppResult<bool> {
        let mut check = self
            .checks
            .get_mut(&check_id)
            .ok_or(AppError::CheckNotFound(check_id))?;

        if check.is_complete() {
            return Ok(false);
        }
        check.apply(outcome);
        Ok(true)
    }

    async fn create_batch(&self, check_ids: &[i64], webhook_uri: Option<&str>) -> AppResult<Batch> {
        let batch = Batch {
            id: self.next_id(),
            webhook_uri: webhook_uri.map(str::to_string),
            webhook_triggered: false,
            created_at: Utc::now(),
        };

        let mut members: Vec<i64> = Vec::with_capacity(check_ids.len());
        for id in check_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }

        self.batch_checks.insert(batch.id, members);
        self.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn get_batch(&self, batch_id: i64) -> AppResult<Option<Batch>> {
        Ok(self.batches.get(&batch_id).map(|entry| entry.value().clone()))
    }

    async fn batch_members(&self, batch_id: i64) -> AppResult<Vec<LinkCheck>> {
        let ids = self
            .batch_checks
            .get(&batch_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.checks.get(&id).map(|entry| entry.value().clone()))
            .map(|check| self.link_check(check))
            .collect()
    }

    async fn batches_for_check(&self, check_id: i64) -> AppResult<Vec<Batch>> {
        let batch_ids: Vec<i64> = self
            .batch_checks
            .iter()
            .filter(|entry| entry.value().contains(&check_id))
            .map(|entry| *entry.key())
            .collect();

        Ok(batch_ids
            .into_iter()
            .filter_map(|id| self.batches.get(&id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn claim_webhook(&self, batch_id: i64) -> AppResult<bool> {
        let Some(mut batch) = self.batches.get_mut(&batch_id) else {
            return Err(AppError::BatchNotFound(batch_id));
        };

        if batch.webhook_triggered {
            return Ok(false);
        }
        batch.webhook_triggered = true;
        Ok(true)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
