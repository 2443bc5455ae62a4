//! Server startup, shutdown, and worker spawning logic.
//!
//! This module contains the `run_server` function which handles:
//! - Database initialization and migrations
//! - Wiring the checker, the runner and the check worker
//! - Router creation
//! - Server binding and graceful shutdown

use crate::checker::{ReqwestClient, UriChecker};
use crate::config::{Config, ReputationConfig};
use crate::error::{AppError, AppResult};
use crate::jobs::{create_job_channel, Worker, WorkerConfig};
use crate::reputation::{DisabledReputation, ReputationLookup, SafeBrowsingClient};
use crate::routes;
use crate::runner::CheckRunner;
use crate::services::CheckService;
use crate::state::AppState;
use crate::store::{CheckStore, Repository};
use crate::webhook::HttpWebhookSender;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Run the web server with the given configuration.
///
/// # Arguments
///
/// * `config` - The application configuration
/// * `should_migrate` - Whether to run database migrations on startup
///
/// # Errors
///
/// This function will return an error if:
/// - Database connection fails
/// - Migration fails
/// - An outbound HTTP client cannot be built
/// - Server binding fails
pub async fn run_server(config: Config, should_migrate: bool) -> AppResult<()> {
    info!("Starting link checker...");

    info!("Connecting to database...");
    let repository = Repository::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout_seconds,
    )
    .await?;

    if should_migrate {
        info!("Running database migrations...");
        repository.run_migrations().await?;
        info!("Migrations completed successfully");
    }

    let store: Arc<dyn CheckStore> = Arc::new(repository);
    let runner = build_runner(&config, store.clone())?;

    // Create background job worker
    let (job_sender, job_receiver) = create_job_channel();
    let worker = Worker::new(runner.clone(), job_receiver)
        .with_config(WorkerConfig::from(&config.worker));

    // Jobs queued by a previous process were lost with it
    runner.requeue_unfinished(&job_sender).await?;

    // Start background worker in separate task
    let worker_handle = tokio::spawn(worker.run());

    let service = CheckService::new(store.clone(), runner, job_sender);
    let state = Arc::new(AppState::new(store, service));

    let app = routes::create_router(state, &config.server.allowed_origins);

    let addr = config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(create_shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    // The router owned the last job sender, so the worker now drains and stops
    worker_handle.await.unwrap_or_else(|e| {
        error!("Worker task failed: {:?}", e);
    });

    info!("Server shutdown complete");
    Ok(())
}

/// Build the check runner with its outbound clients.
pub fn build_runner(config: &Config, store: Arc<dyn CheckStore>) -> AppResult<CheckRunner> {
    let client = ReqwestClient::new()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let webhook = HttpWebhookSender::new(Duration::from_secs(config.webhook.timeout_seconds))
        .map_err(|e| AppError::Internal(format!("Failed to build webhook client: {}", e)))?;

    let checker = UriChecker::new(Arc::new(client), reputation_lookup(&config.reputation)?);

    Ok(CheckRunner::new(store, checker, Arc::new(webhook)))
}

/// Pick the reputation lookup for this configuration.
pub fn reputation_lookup(config: &ReputationConfig) -> AppResult<Arc<dyn ReputationLookup>> {
    match &config.google_api_key {
        Some(key) => {
            let client =
                SafeBrowsingClient::new(key.clone(), Duration::from_secs(config.timeout_seconds))
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to build reputation client: {}", e))
                    })?;
            Ok(Arc::new(client))
        }
        None => {
            warn!("GOOGLE_API_KEY not set, reputation lookups disabled");
            Ok(Arc::new(DisabledReputation))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received.
///
/// On Unix-like systems, this listens for both Ctrl+C (SIGINT) and SIGTERM.
/// On other platforms, it only listens for Ctrl+C.
async fn create_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    info!("Shutdown signal received");
}
