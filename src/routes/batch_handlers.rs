use crate::error::{AppError, AppResult};
use crate::models::CreateBatchRequest;
use crate::util::window_from_secs;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use super::AppState;

/// Submit a batch of links.
///
/// Answers 201 when every link already has a result, 202 while checks run.
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBatchRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidRequest(format!("Validation failed: {}", e)))?;

    let checked_within = payload.checked_within.and_then(window_from_secs);

    let created = state
        .service
        .create_batch(&payload.uris, checked_within, payload.webhook_uri.as_deref())
        .await?;

    let status = if created.is_completed() {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };

    Ok((status, Json(created.report)))
}

/// Current state of a batch
pub async fn get_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let report = state.service.get_batch(id).await?;
    Ok(Json(report))
}
