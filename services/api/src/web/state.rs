//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use intake_core::{
    intake::IntakeService,
    pipeline::SearchPipeline,
    ports::ResultStore,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    pub results: Arc<dyn ResultStore>,
    pub pipeline: Arc<SearchPipeline>,
}
