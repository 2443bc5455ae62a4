use crate::runner::CheckRunner;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Request to run one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckJob {
    pub check_id: i64,
    /// Reuse another check of the same link that ended within this window
    pub checked_within: Option<Duration>,
}

/// Background job types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Run a link check
    Check(CheckJob),
}

/// Background worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Attempts per job before giving up, including the first
    pub max_attempts: u32,
    /// Backoff duration between attempts
    pub retry_delay_ms: u64,
    /// Jobs processed at the same time
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
            concurrency: 8,
        }
    }
}

/// Background job worker
pub struct Worker {
    runner: CheckRunner,
    receiver: mpsc::UnboundedReceiver<Job>,
    config: WorkerConfig,
}

impl Worker {
    /// Create a new worker
    pub fn new(runner: CheckRunner, receiver: mpsc::UnboundedReceiver<Job>) -> Self {
        Self {
            runner,
            receiver,
            config: WorkerConfig::default(),
        }
    }

    /// Set worker configuration
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the worker - processes jobs until the channel closes, then waits
    /// for the jobs still in flight
    pub async fn run(mut self) {
        info!(concurrency = self.config.concurrency, "Background worker started");

        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        while let Some(job) = self.receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            let runner = self.runner.clone();
            let config = self.config.clone();
            tasks.spawn(async move {
                process_job(&runner, &config, job).await;
                drop(permit);
            });

            // Reap finished tasks so the set does not grow unbounded
            while tasks.try_join_next().is_some() {}
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Job task panicked: {}", e);
            }
        }

        info!("Background worker stopped");
    }
}

/// Process a single job with retries
async fn process_job(runner: &CheckRunner, config: &WorkerConfig, job: Job) {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match execute_job(runner, &job).await {
            Ok(()) => break,
            Err(e) if attempt < max_attempts => {
                let delay = std::time::Duration::from_millis(config.retry_delay_ms);
                warn!(
                    "Job failed (attempt {}/{}), retrying in {:?}: {:?}: {}",
                    attempt, max_attempts, delay, job, e
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!("Job failed after {} attempts: {:?}: {}", max_attempts, job, e);
                give_up(runner, &job).await;
                break;
            }
        }
    }
}

/// Execute a job without retries
async fn execute_job(runner: &CheckRunner, job: &Job) -> crate::error::AppResult<()> {
    match job {
        Job::Check(check) => runner.perform(check).await,
    }
}

/// Runs once per job, after its last failed attempt
async fn give_up(runner: &CheckRunner, job: &Job) {
    match job {
        Job::Check(check) => {
            if let Err(e) = runner.fail_exhausted(check.check_id).await {
                error!(check_id = check.check_id, "Could not record failed check: {}", e);
            }
        }
    }
}

/// Job sender - used to submit jobs to the worker
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobSender {
    /// Create a new job sender
    pub fn new(sender: mpsc::UnboundedSender<Job>) -> Self {
        Self { sender }
    }

    /// Submit a job to be processed asynchronously
    pub fn send(&self, job: Job) {
        if self.sender.send(job).is_err() {
            error!("Failed to send job to worker - channel may be closed");
        }
    }

    /// Submit a link check
    pub fn enqueue_check(&self, check_id: i64, checked_within: Option<Duration>) {
        self.send(Job::Check(CheckJob {
            check_id,
            checked_within,
        }));
    }
}

/// Create a new job sender and receiver pair
pub fn create_job_channel() -> (JobSender, mpsc::UnboundedReceiver<Job>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (JobSender::new(sender), receiver)
}
