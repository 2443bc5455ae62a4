use super::CheckStore;
use crate::error::{AppError, AppResult};
use crate::models::{Batch, Check, CheckOutcome, Link, LinkCheck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
    ConnectOptions, PgPool,
};
use std::str::FromStr;
use std::time::Duration;

/// Database repository
#[derive(Clone)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    /// Create a new repository with a connection pool
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_seconds: u64,
    ) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid database URL: {}", e)))?
            .disable_statement_logging();

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckStore for Repository {
    async fn find_or_create_link(&self, uri: &str) -> AppResult<Link> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let link = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (uri, created_at)
            VALUES ($1, $2)
            ON CONFLICT (uri) DO UPDATE SET uri = EXCLUDED.uri
            RETURNING id, uri, created_at
            "#,
        )
        .bind(uri)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    async fn latest_check_for_link(&self, link_id: i64) -> AppResult<Option<Check>> {
        let check = sqlx::query_as::<_, Check>(
            r#"
            SELECT * FROM checks
            WHERE link_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(check)
    }

    async fn fresh_check_for_link(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        exclude: i64,
    ) -> AppResult<Option<Check>> {
        let check = sqlx::query_as::<_, Check>(
            r#"
            SELECT * FROM checks
            WHERE link_id = $1
              AND id <> $2
              AND completed_at IS NOT NULL
              AND completed_at >= $3
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(link_id)
        .bind(exclude)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(check)
    }

    async fn create_check(&self, link_id: i64) -> AppResult<Check> {
        let check = sqlx::query_as::<_, Check>(
            r#"
            INSERT INTO checks (link_id, created_at)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(link_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(check)
    }

    async fn get_check(&self, check_id: i64) -> AppResult<Option<LinkCheck>> {
        let entry = sqlx::query_as::<_, LinkCheck>(
            r#"
            SELECT links.uri, checks.*
            FROM checks
            JOIN links ON links.id = checks.link_id
            WHERE checks.id = $1
            "#,
        )
        .bind(check_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn mark_check_started(&self, check_id: i64, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE checks
            SET started_at = $1
            WHERE id = $2 AND started_at IS NULL AND completed_at IS NULL
            "#,
        )
        .bind(at)
        .bind(check_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_check_start(&self, check_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE checks
            SET started_at = NULL
            WHERE id = $1 AND completed_at IS NULL
            "#,
        )
        .bind(check_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn release_unfinished_checks(&self) -> AppResult<Vec<i64>> {
        let mut ids: Vec<i64> = sqlx::query_scalar(
            r#"
            UPDATE checks
            SET started_at = NULL
            WHERE completed_at IS NULL
            RETURNING id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        ids.sort_unstable();
        Ok(ids)
    }

    async fn complete_check(&self, check_id: i64, outcome: &CheckOutcome) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE checks
            SET link_errors = $1,
                link_warnings = $2,
                problem_summary = $3,
                suggested_fix = $4,
                completed_at = $5
            WHERE id = $6 AND completed_at IS NULL
            "#,
        )
        .bind(Json(&outcome.link_errors))
        .bind(Json(&outcome.link_warnings))
        .bind(&outcome.problem_summary)
        .bind(&outcome.suggested_fix)
        .bind(outcome.completed_at)
        .bind(check_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_batch(&self, check_ids: &[i64], webhook_uri: Option<&str>) -> AppResult<Batch> {
        let mut tx = self.pool.begin().await?;

        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (webhook_uri, webhook_triggered, created_at)
            VALUES ($1, FALSE, $2)
            RETURNING *
            "#,
        )
        .bind(webhook_uri)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for (position, check_id) in check_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO batch_checks (batch_id, check_id, position)
                VALUES ($1, $2, $3)
                ON CONFLICT (batch_id, check_id) DO NOTHING
                "#,
            )
            .bind(batch.id)
            .bind(check_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(batch)
    }

    async fn get_batch(&self, batch_id: i64) -> AppResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    async fn batch_members(&self, batch_id: i64) -> AppResult<Vec<LinkCheck>> {
        let members = sqlx::query_as::<_, LinkCheck>(
            r#"
            SELECT links.uri, checks.*
            FROM batch_checks
            JOIN checks ON checks.id = batch_checks.check_id
            JOIN links ON links.id = checks.link_id
            WHERE batch_checks.batch_id = $1
            ORDER BY batch_checks.position
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn batches_for_check(&self, check_id: i64) -> AppResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT batches.*
            FROM batches
            JOIN batch_checks ON batch_checks.batch_id = batches.id
            WHERE batch_checks.check_id = $1
            "#,
        )
        .bind(check_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    async fn claim_webhook(&self, batch_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE batches
            SET webhook_triggered = TRUE
            WHERE id = $1 AND webhook_triggered = FALSE
            "#,
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
