//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::{pipeline_task::spawn_pipeline, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use intake_core::{
    domain::{ApplicationRecord, Company, Session, SessionStatus, Turn},
    intake::{IntakeService, TurnOutcome},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        get_session_handler,
        submit_answer_handler,
        end_session_handler,
        get_application_handler,
    ),
    components(
        schemas(
            CreateSessionResponse,
            SessionResponse,
            TurnResponse,
            AnswerRequest,
            AnswerResponse,
            EndSessionResponse,
            ApplicationResponse,
        )
    ),
    tags(
        (name = "Product Intake API", description = "Product intake interviews and the companies found for each application.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after successfully creating a session.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    /// The opening question.
    pub question: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TurnResponse {
    /// `assistant`, `user` or `system`.
    pub role: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Turn> for TurnResponse {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            question: turn.question.clone(),
            answer: turn.answer.clone(),
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    /// `active` or `completed`.
    pub status: String,
    /// The question awaiting an answer, or the last question asked.
    pub question: String,
    pub turns: Vec<TurnResponse>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            status: session.status.as_str().to_string(),
            question: IntakeService::current_question(session),
            turns: session.turns.iter().map(TurnResponse::from).collect(),
        }
    }
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct AnswerRequest {
    /// A missing or blank answer re-asks the pending question.
    #[serde(default)]
    pub answer: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AnswerResponse {
    pub status: String,
    /// The next question, or the closing message when the session just finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EndSessionResponse {
    pub status: String,
}

/// The stored search results for one application.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub application: String,
    pub search_terms: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub companies: Vec<Company>,
    /// `OK`, `ERROR` or `ZERO_RESULTS`.
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ApplicationRecord> for ApplicationResponse {
    fn from(record: ApplicationRecord) -> Self {
        Self {
            application: record.application,
            search_terms: record.search_terms,
            companies: record.companies,
            status: record.status.as_str().to_string(),
            updated_at: record.updated_at,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Start a new intake session.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (session_id, question) = app_state.intake.start_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            question,
        }),
    ))
}

/// Fetch a session with its transcript.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "The session id.")),
    responses(
        (status = 200, description = "The session", body = SessionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = app_state.intake.session(session_id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Submit the respondent's answer to the pending question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    params(("id" = Uuid, Path, description = "The session id.")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "The next question, or completion", body = AnswerResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn submit_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let outcome = app_state
        .intake
        .submit_answer(session_id, &payload.answer)
        .await?;

    let response = match outcome {
        TurnOutcome::Question(question) => AnswerResponse {
            status: SessionStatus::Active.as_str().to_string(),
            question: Some(question),
        },
        TurnOutcome::Completed {
            closing,
            newly_completed,
        } => {
            if newly_completed {
                spawn_pipeline(app_state.clone(), session_id);
            }
            AnswerResponse {
                status: SessionStatus::Completed.as_str().to_string(),
                question: closing,
            }
        }
    };
    Ok(Json(response))
}

/// End the conversation early.
#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    params(("id" = Uuid, Path, description = "The session id.")),
    responses(
        (status = 200, description = "The session is completed", body = EndSessionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn end_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    if app_state.intake.end_session(session_id).await? {
        info!("Session {} ended by the respondent.", session_id);
        spawn_pipeline(app_state.clone(), session_id);
    }
    Ok(Json(EndSessionResponse {
        status: SessionStatus::Completed.as_str().to_string(),
    }))
}

/// Fetch the companies stored for an application.
#[utoipa::path(
    get,
    path = "/applications/{application}",
    params(("application" = String, Path, description = "The application text, URL-encoded.")),
    responses(
        (status = 200, description = "The stored application document", body = ApplicationResponse),
        (status = 404, description = "No results stored for this application")
    )
)]
pub async fn get_application_handler(
    State(app_state): State<Arc<AppState>>,
    Path(application): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let record = app_state.results.get_application(&application).await?;
    Ok(Json(ApplicationResponse::from(record)))
}
