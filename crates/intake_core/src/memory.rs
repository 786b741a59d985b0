//! crates/intake_core/src/memory.rs
//!
//! In-memory implementations of the storage ports, used by tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ApplicationRecord, Session, SessionStatus, Turn};
use crate::ports::{PortError, PortResult, ResultStore, TranscriptStore};

#[derive(Default)]
pub struct InMemoryTranscriptStore {
    sessions: RwLock<Vec<Session>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Session {} not found", session_id))
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn create_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.id == session_id) {
            return Err(PortError::Unexpected(format!(
                "Session {} already exists",
                session_id
            )));
        }
        sessions.push(Session {
            id: session_id,
            status: SessionStatus::Active,
            turns: Vec::new(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn append_turn(&self, session_id: Uuid, turn: Turn) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| not_found(session_id))?;
        session.turns.push(turn);
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn mark_completed(&self, session_id: Uuid) -> PortResult<bool> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| not_found(session_id))?;
        if session.is_completed() {
            return Ok(false);
        }
        session.status = SessionStatus::Completed;
        Ok(true)
    }

    async fn latest_session_id(&self) -> PortResult<Option<Uuid>> {
        // Sessions are kept in creation order.
        Ok(self.sessions.read().await.last().map(|s| s.id))
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    records: RwLock<HashMap<String, ApplicationRecord>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn upsert_application(&self, record: ApplicationRecord) -> PortResult<()> {
        self.records
            .write()
            .await
            .insert(record.application.clone(), record);
        Ok(())
    }

    async fn get_application(&self, application: &str) -> PortResult<ApplicationRecord> {
        self.records
            .read()
            .await
            .get(application)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Application '{}' not found", application)))
    }
}
