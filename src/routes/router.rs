use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::batch_handlers;
use super::health;
use super::link_handlers;
use super::AppState;
use crate::middleware::request_id_middleware;

/// Create application router
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> axum::Router {
    axum::Router::new()
        .route("/check-link", get(link_handlers::check_link))
        .route("/batch", post(batch_handlers::create_batch))
        .route("/batch/{id}", get(batch_handlers::get_batch))
        .route("/_health", get(health::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origins)),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|s| s.parse::<http::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
