//! HTTP API for the chat page

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::turn::TurnController;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TurnController>,
}

impl AppState {
    pub fn new(controller: Arc<TurnController>) -> Self {
        Self { controller }
    }
}
