pub mod pipeline_task;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use rest::{
    create_session_handler, end_session_handler, get_application_handler, get_session_handler,
    submit_answer_handler,
};
pub use state::AppState;

/// Builds the JSON API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/sessions/{id}/answers", post(submit_answer_handler))
        .route("/sessions/{id}/end", post(end_session_handler))
        .route("/applications/{application}", get(get_application_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
