//! services/api/src/web/pipeline_task.rs
//!
//! The background task that runs the search pipeline once a session completes.

use crate::web::state::AppState;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Launches the pipeline for `session_id` without waiting for it.
///
/// The respondent's request never depends on the outcome; failures are only logged.
pub fn spawn_pipeline(app_state: Arc<AppState>, session_id: Uuid) {
    info!(
        "Spawning background task to run the search pipeline for session {}.",
        session_id
    );
    tokio::spawn(run_pipeline(app_state, session_id));
}

pub async fn run_pipeline(app_state: Arc<AppState>, session_id: Uuid) {
    let session = match app_state.intake.session(session_id).await {
        Ok(session) => session,
        Err(e) => {
            error!(
                "Failed to load transcript for session {}. Pipeline skipped: {}",
                session_id, e
            );
            return;
        }
    };

    match app_state.pipeline.run(&session.turns).await {
        Ok(report) => info!(
            "Pipeline finished for session {}: {} applications stored.",
            session_id,
            report.entries.len()
        ),
        Err(e) => error!("Pipeline failed for session {}: {}", session_id, e),
    }
}
