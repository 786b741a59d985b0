//! crates/intake_core/src/ports.rs
//!
//! Defines the service contracts (traits) the conversation engine and the
//! search pipeline depend on. These traits form the boundary of the hexagonal
//! architecture, allowing the core to be independent of specific external
//! implementations like databases, model APIs or map services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ApplicationRecord, ChatMessage, GeoPoint, PlacesPage, PlacesQuery, Session, Turn};
use crate::schema::StringListSchema;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("The call timed out: {0}")]
    Timeout(String),
    #[error("The service returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Append-only transcript storage keyed by session id.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn create_session(&self, session_id: Uuid) -> PortResult<()>;

    async fn append_turn(&self, session_id: Uuid, turn: Turn) -> PortResult<()>;

    /// Loads a session with all of its turns in insertion order.
    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    /// Moves an active session to completed. Returns `false` when it was already completed.
    async fn mark_completed(&self, session_id: Uuid) -> PortResult<bool>;

    /// The most recently created session, if any.
    async fn latest_session_id(&self) -> PortResult<Option<Uuid>>;
}

#[async_trait]
pub trait ChatModelService: Send + Sync {
    /// Returns one text completion for a role-tagged message sequence.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> PortResult<String>;
}

#[async_trait]
pub trait StructuredGenerationService: Send + Sync {
    /// Runs a prompt and decodes the answer into the list described by `schema`.
    async fn generate_list(&self, prompt: &str, schema: &StringListSchema) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait PlacesSearchService: Send + Sync {
    /// Fetches a single page of text-search results.
    async fn search_text(&self, query: &PlacesQuery) -> PortResult<PlacesPage>;
}

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Resolves a free-text location. `Ok(None)` means the location was not found.
    async fn geocode(&self, location: &str) -> PortResult<Option<GeoPoint>>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replaces the whole document stored under `record.application`.
    async fn upsert_application(&self, record: ApplicationRecord) -> PortResult<()>;

    async fn get_application(&self, application: &str) -> PortResult<ApplicationRecord>;
}
