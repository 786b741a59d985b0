//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `TranscriptStore` and `ResultStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::domain::{
    ApplicationRecord, Company, Role, SearchStatus, Session, SessionStatus, Turn,
};
use intake_core::ports::{PortError, PortResult, ResultStore, TranscriptStore};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

const FOREIGN_KEY_VIOLATION: &str = "23503";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
///
/// Completion is a conditional update, so only one caller ever observes the
/// active-to-completed transition even across processes.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn session_not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Session {} not found", session_id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TurnRecord {
    role: String,
    question: String,
    answer: String,
    created_at: DateTime<Utc>,
}
impl TurnRecord {
    fn to_domain(self) -> PortResult<Turn> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown turn role '{}'", self.role)))?;
        Ok(Turn {
            role,
            question: self.question,
            answer: self.answer,
            timestamp: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    application: String,
    search_terms: Json<Vec<String>>,
    companies: Json<Vec<Company>>,
    status: String,
    updated_at: DateTime<Utc>,
}
impl ApplicationRow {
    fn to_domain(self) -> PortResult<ApplicationRecord> {
        let status = SearchStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown search status '{}'", self.status))
        })?;
        Ok(ApplicationRecord {
            application: self.application,
            search_terms: self.search_terms.0,
            companies: self.companies.0,
            status,
            updated_at: self.updated_at,
        })
    }
}

//=========================================================================================
// `TranscriptStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TranscriptStore for DbAdapter {
    async fn create_session(&self, session_id: Uuid) -> PortResult<()> {
        sqlx::query("INSERT INTO intake_sessions (id, status) VALUES ($1, $2)")
            .bind(session_id)
            .bind(SessionStatus::Active.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn append_turn(&self, session_id: Uuid, turn: Turn) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO intake_turns (session_id, role, question, answer, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session_id)
        .bind(turn.role.as_str())
        .bind(&turn.question)
        .bind(&turn.answer)
        .bind(turn.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error().and_then(|d| d.code()) {
            Some(code) if code == FOREIGN_KEY_VIOLATION => session_not_found(session_id),
            _ => unexpected(e),
        })?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, status, created_at FROM intake_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => session_not_found(session_id),
            _ => unexpected(e),
        })?;

        let turns = sqlx::query_as::<_, TurnRecord>(
            "SELECT role, question, answer, created_at FROM intake_turns WHERE session_id = $1 ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(TurnRecord::to_domain)
        .collect::<PortResult<Vec<Turn>>>()?;

        let status = SessionStatus::parse(&record.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown session status '{}'", record.status))
        })?;

        Ok(Session {
            id: record.id,
            status,
            turns,
            created_at: record.created_at,
        })
    }

    async fn mark_completed(&self, session_id: Uuid) -> PortResult<bool> {
        let result =
            sqlx::query("UPDATE intake_sessions SET status = $1 WHERE id = $2 AND status = $3")
                .bind(SessionStatus::Completed.as_str())
                .bind(session_id)
                .bind(SessionStatus::Active.as_str())
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing changed: either already completed or unknown.
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM intake_sessions WHERE id = $1)",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        if exists {
            Ok(false)
        } else {
            Err(session_not_found(session_id))
        }
    }

    async fn latest_session_id(&self) -> PortResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM intake_sessions ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }
}

//=========================================================================================
// `ResultStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResultStore for DbAdapter {
    async fn upsert_application(&self, record: ApplicationRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO application_results (application, search_terms, companies, status, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (application) DO UPDATE SET \
                search_terms = EXCLUDED.search_terms, \
                companies = EXCLUDED.companies, \
                status = EXCLUDED.status, \
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&record.application)
        .bind(Json(&record.search_terms))
        .bind(Json(&record.companies))
        .bind(record.status.as_str())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_application(&self, application: &str) -> PortResult<ApplicationRecord> {
        sqlx::query_as::<_, ApplicationRow>(
            "SELECT application, search_terms, companies, status, updated_at FROM application_results WHERE application = $1",
        )
        .bind(application)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Application '{}' not found", application))
            }
            _ => unexpected(e),
        })?
        .to_domain()
    }
}
