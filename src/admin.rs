//! Administrative command handlers.
//!
//! CLI commands for running migrations and for checking a single link from
//! the terminal without the server or the database.

use crate::checker::{ReqwestClient, UriChecker};
use crate::config::{Config, ReputationConfig};
use crate::error::{AppError, AppResult};
use crate::server::reputation_lookup;
use crate::store::Repository;
use clap::Subcommand;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Administrative commands available via CLI.
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Run database migrations
    Migrate,

    /// Check one link and print its report as JSON
    Check {
        /// The link to check
        uri: String,
    },
}

/// Run an administrative command.
///
/// # Arguments
///
/// * `admin_command` - The admin command to execute
pub async fn run(admin_command: AdminCommands) -> AppResult<()> {
    match admin_command {
        AdminCommands::Migrate => migrate(Config::from_env()?).await,
        AdminCommands::Check { uri } => check(&uri).await,
    }
}

/// Run database migrations.
async fn migrate(config: Config) -> AppResult<()> {
    info!("Running database migrations...");

    let repository = Repository::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout_seconds,
    )
    .await?;

    repository.run_migrations().await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// Check a link and print the report.
async fn check(uri: &str) -> AppResult<()> {
    dotenvy::dotenv().ok();
    let reputation = ReputationConfig::from_source(&|name| env::var(name).ok())?;

    let client = ReqwestClient::new()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let checker = UriChecker::new(Arc::new(client), reputation_lookup(&reputation)?);

    info!("Checking {}...", uri);
    let report = checker.check(uri).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(summary) = report.problem_summary() {
        println!("\n{}", summary);
    }
    if let Some(fix) = report.suggested_fix() {
        println!("{}", fix);
    }

    Ok(())
}
