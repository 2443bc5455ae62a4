use crate::services::CheckService;
use crate::store::CheckStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Wrapped in `Arc` and handed to every handler through Axum's `State`
/// extraction.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for links, checks and batches
    pub store: Arc<dyn CheckStore>,

    /// Creates, schedules and renders checks
    pub service: CheckService,
}

impl AppState {
    pub fn new(store: Arc<dyn CheckStore>, service: CheckService) -> Self {
        Self { store, service }
    }
}
