pub mod batch_handlers;
pub mod health;
pub mod link_handlers;
mod router;
pub mod types;

pub use router::create_router;

// Re-export AppState for convenience
pub use crate::state::AppState;
