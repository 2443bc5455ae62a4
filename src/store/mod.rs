//! Persistence for links, checks and batches.
//!
//! Conditional updates (`mark_check_started`, `complete_check`,
//! `claim_webhook`) report whether they took effect; callers rely on that
//! instead of reading state first.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::Repository;

use crate::error::AppResult;
use crate::models::{Batch, Check, CheckOutcome, Link, LinkCheck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Look up a link by URI, creating it on first sight
    async fn find_or_create_link(&self, uri: &str) -> AppResult<Link>;

    /// Newest check of a link, whatever its state
    async fn latest_check_for_link(&self, link_id: i64) -> AppResult<Option<Check>>;

    /// Newest check of a link, other than `exclude`, that ended at or after `since`
    async fn fresh_check_for_link(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        exclude: i64,
    ) -> AppResult<Option<Check>>;

    async fn create_check(&self, link_id: i64) -> AppResult<Check>;

    async fn get_check(&self, check_id: i64) -> AppResult<Option<LinkCheck>>;

    /// Set the start time if the check has neither timestamp yet
    async fn mark_check_started(&self, check_id: i64, at: DateTime<Utc>) -> AppResult<bool>;

    /// Clear the start time of a check that has not ended
    async fn reset_check_start(&self, check_id: i64) -> AppResult<()>;

    /// Clear the start time of every check that has not ended and return
    /// their ids, oldest first
    async fn release_unfinished_checks(&self) -> AppResult<Vec<i64>>;

    /// Write the terminal result if the check has not ended yet
    async fn complete_check(&self, check_id: i64, outcome: &CheckOutcome) -> AppResult<bool>;

    /// Create a batch over the given checks, kept in the given order
    async fn create_batch(&self, check_ids: &[i64], webhook_uri: Option<&str>) -> AppResult<Batch>;

    async fn get_batch(&self, batch_id: i64) -> AppResult<Option<Batch>>;

    async fn batch_members(&self, batch_id: i64) -> AppResult<Vec<LinkCheck>>;

    async fn batches_for_check(&self, check_id: i64) -> AppResult<Vec<Batch>>;

    /// Flip `webhook_triggered` from false to true; only one caller ever wins
    async fn claim_webhook(&self, batch_id: i64) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;
}
