use crate::error::{AppError, AppResult};
use crate::routes::types::CheckLinkQuery;
use crate::util::window_from_secs;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use std::sync::Arc;

use super::AppState;

/// Report on a single link, scheduling a check when needed
pub async fn check_link(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckLinkQuery>,
) -> AppResult<impl IntoResponse> {
    let uri = query
        .uri
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("uri is required".to_string()))?;

    let checked_within = query.checked_within.and_then(window_from_secs);

    let report = state
        .service
        .check_link(&uri, checked_within, query.synchronous)
        .await?;

    Ok(Json(report))
}
