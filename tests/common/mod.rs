//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use chrono::{DateTime, Utc};
use link_checker_api::checker::{HttpClient, ProbeError, ProbeResponse, UriChecker};
use link_checker_api::error::{AppError, AppResult};
use link_checker_api::jobs::{create_job_channel, Job};
use link_checker_api::models::{Batch, BatchReport, Check, CheckOutcome, Link, LinkCheck};
use link_checker_api::reputation::DisabledReputation;
use link_checker_api::runner::CheckRunner;
use link_checker_api::services::CheckService;
use link_checker_api::store::{CheckStore, MemoryStore};
use link_checker_api::webhook::{WebhookError, WebhookSender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

#[derive(Clone)]
struct Reply {
    delay: Duration,
    outcome: Result<ProbeResponse, ProbeError>,
}

/// HTTP client answering from a per-URL script.
///
/// Unscripted URLs fail to connect.
#[derive(Default)]
pub struct ScriptedClient {
    head: DashMap<String, Reply>,
    get: DashMap<String, Reply>,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(self, url: &str, response: ProbeResponse) -> Self {
        self.head_delayed(url, Duration::ZERO, response)
    }

    pub fn head_delayed(self, url: &str, delay: Duration, response: ProbeResponse) -> Self {
        self.head.insert(
            key(url),
            Reply {
                delay,
                outcome: Ok(response),
            },
        );
        self
    }

    pub fn head_error(self, url: &str, error: ProbeError) -> Self {
        self.head.insert(
            key(url),
            Reply {
                delay: Duration::ZERO,
                outcome: Err(error),
            },
        );
        self
    }

    pub fn get(self, url: &str, response: ProbeResponse) -> Self {
        self.get.insert(
            key(url),
            Reply {
                delay: Duration::ZERO,
                outcome: Ok(response),
            },
        );
        self
    }

    /// Plain-text 200 for HEAD
    pub fn ok(self, url: &str) -> Self {
        self.head(url, ProbeResponse::with_status(200).content_type("text/plain"))
    }

    /// Redirect from one URL to another
    pub fn redirect(self, from: &str, status: u16, to: &str) -> Self {
        self.head(from, ProbeResponse::with_status(status).location(to))
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    async fn answer(
        script: &DashMap<String, Reply>,
        url: &Url,
    ) -> Result<ProbeResponse, ProbeError> {
        let reply = script.get(url.as_str()).map(|entry| entry.value().clone());
        match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                reply.outcome
            }
            None => Err(ProbeError::Connect),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Self::answer(&self.head, url).await
    }

    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Self::answer(&self.get, url).await
    }
}

/// Webhook sender that keeps every delivery
#[derive(Default)]
pub struct RecordingWebhook {
    deliveries: Mutex<Vec<(String, BatchReport)>>,
}

impl RecordingWebhook {
    pub fn deliveries(&self) -> Vec<(String, BatchReport)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookSender for RecordingWebhook {
    async fn deliver(&self, target: &str, payload: &BatchReport) -> Result<(), WebhookError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((target.to_string(), payload.clone()));
        Ok(())
    }
}

/// `MemoryStore` whose next terminal writes fail
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    failing_completes: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>, failing_completes: usize) -> Self {
        Self {
            inner,
            failing_completes: AtomicUsize::new(failing_completes),
        }
    }
}

#[async_trait]
impl CheckStore for FailingStore {
    async fn find_or_create_link(&self, uri: &str) -> AppResult<Link> {
        self.inner.find_or_create_link(uri).await
    }

    async fn latest_check_for_link(&self, link_id: i64) -> AppResult<Option<Check>> {
        self.inner.latest_check_for_link(link_id).await
    }

    async fn fresh_check_for_link(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        exclude: i64,
    ) -> AppResult<Option<Check>> {
        self.inner.fresh_check_for_link(link_id, since, exclude).await
    }

    async fn create_check(&self, link_id: i64) -> AppResult<Check> {
        self.inner.create_check(link_id).await
    }

    async fn get_check(&self, check_id: i64) -> AppResult<Option<LinkCheck>> {
        self.inner.get_check(check_id).await
    }

    async fn mark_check_started(&self, check_id: i64, at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.mark_check_started(check_id, at).await
    }

    async fn reset_check_start(&self, check_id: i64) -> AppResult<()> {
        self.inner.reset_check_start(check_id).await
    }

    async fn release_unfinished_checks(&self) -> AppResult<Vec<i64>> {
        self.inner.release_unfinished_checks().await
    }

    async fn complete_check(&self, check_id: i64, outcome: &CheckOutcome) -> AppResult<bool> {
        let failing = self
            .failing_completes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::Internal("connection reset".to_string()));
        }
        self.inner.complete_check(check_id, outcome).await
    }

    async fn create_batch(&self, check_ids: &[i64], webhook_uri: Option<&str>) -> AppResult<Batch> {
        self.inner.create_batch(check_ids, webhook_uri).await
    }

    async fn get_batch(&self, batch_id: i64) -> AppResult<Option<Batch>> {
        self.inner.get_batch(batch_id).await
    }

    async fn batch_members(&self, batch_id: i64) -> AppResult<Vec<LinkCheck>> {
        self.inner.batch_members(batch_id).await
    }

    async fn batches_for_check(&self, check_id: i64) -> AppResult<Vec<Batch>> {
        self.inner.batches_for_check(check_id).await
    }

    async fn claim_webhook(&self, batch_id: i64) -> AppResult<bool> {
        self.inner.claim_webhook(batch_id).await
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }
}

pub fn checker(client: Arc<ScriptedClient>) -> UriChecker {
    UriChecker::new(client, Arc::new(DisabledReputation))
}

/// Everything needed to drive checks end to end without a network or database
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub client: Arc<ScriptedClient>,
    pub webhook: Arc<RecordingWebhook>,
    pub runner: CheckRunner,
    pub service: CheckService,
    pub receiver: mpsc::UnboundedReceiver<Job>,
}

impl Harness {
    pub fn new(client: ScriptedClient) -> Self {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(client);
        let webhook = Arc::new(RecordingWebhook::default());
        let runner = CheckRunner::new(store.clone(), checker(client.clone()), webhook.clone());
        let (jobs, receiver) = create_job_channel();
        let service = CheckService::new(store.clone(), runner.clone(), jobs);

        Self {
            store,
            client,
            webhook,
            runner,
            service,
            receiver,
        }
    }

    /// Run every queued job once, in order
    pub async fn run_queued(&mut self) {
        while let Ok(Job::Check(job)) = self.receiver.try_recv() {
            self.runner.perform(&job).await.unwrap();
        }
    }
}
