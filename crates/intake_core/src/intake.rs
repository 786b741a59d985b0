//! crates/intake_core/src/intake.rs
//!
//! Drives one intake session: stores every turn, asks the engine for the next
//! question and tracks when the session is over.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{pending_question, Session, Turn};
use crate::engine::{ConversationEngine, NextStep, OPENING_QUESTION};
use crate::ports::{PortResult, TranscriptStore};

/// The result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The respondent should answer this question next.
    Question(String),
    /// The session is over. `closing` is the final assistant message, if one was issued.
    Completed {
        closing: Option<String>,
        newly_completed: bool,
    },
}

/// Runs intake sessions over a transcript store.
///
/// Calls that change one session are serialized by a per-session lock, so the
/// transcript keeps alternating and nothing follows the terminal marker.
pub struct IntakeService {
    store: Arc<dyn TranscriptStore>,
    engine: ConversationEngine,
    session_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl IntakeService {
    pub fn new(store: Arc<dyn TranscriptStore>, engine: ConversationEngine) -> Self {
        Self {
            store,
            engine,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a session and issues its opening question.
    pub async fn start_session(&self) -> PortResult<(Uuid, String)> {
        let session_id = Uuid::new_v4();
        self.store.create_session(session_id).await?;

        let question = match self.engine.next_question(&[]).await {
            NextStep::Ask(question) => question,
            _ => OPENING_QUESTION.to_string(),
        };
        self.store
            .append_turn(session_id, Turn::assistant(question.clone()))
            .await?;

        info!("Started intake session {}", session_id);
        Ok((session_id, question))
    }

    pub async fn session(&self, session_id: Uuid) -> PortResult<Session> {
        self.store.get_session(session_id).await
    }

    /// The question currently awaiting an answer.
    pub fn current_question(session: &Session) -> String {
        pending_question(&session.turns)
            .unwrap_or(OPENING_QUESTION)
            .to_string()
    }

    pub async fn submit_answer(&self, session_id: Uuid, answer: &str) -> PortResult<TurnOutcome> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let session = self.store.get_session(session_id).await?;
        if session.is_completed() {
            return Ok(TurnOutcome::Completed {
                closing: None,
                newly_completed: false,
            });
        }

        let answer = answer.trim();
        if answer.is_empty() {
            // Resubmitting empty input re-asks without touching the transcript.
            return Ok(TurnOutcome::Question(Self::current_question(&session)));
        }

        let mut turns = session.turns;
        let user_turn = Turn::user(answer);
        self.store.append_turn(session_id, user_turn.clone()).await?;
        turns.push(user_turn);

        let step = self.engine.next_question(&turns).await;

        // Another process may have ended the session while the model was answering.
        if self.store.get_session(session_id).await?.is_completed() {
            warn!(
                "Session {} completed during question generation; discarding the question.",
                session_id
            );
            return Ok(TurnOutcome::Completed {
                closing: None,
                newly_completed: false,
            });
        }

        match step {
            NextStep::Ask(question) => {
                self.store
                    .append_turn(session_id, Turn::assistant(question.clone()))
                    .await?;
                Ok(TurnOutcome::Question(question))
            }
            NextStep::Finish(closing) => {
                self.store
                    .append_turn(session_id, Turn::assistant(closing.clone()))
                    .await?;
                let newly_completed = self.complete(session_id).await?;
                Ok(TurnOutcome::Completed {
                    closing: Some(closing),
                    newly_completed,
                })
            }
            NextStep::Complete => {
                let newly_completed = self.complete(session_id).await?;
                Ok(TurnOutcome::Completed {
                    closing: None,
                    newly_completed,
                })
            }
        }
    }

    /// Ends the conversation at the respondent's request.
    ///
    /// Returns whether this call completed the session.
    pub async fn end_session(&self, session_id: Uuid) -> PortResult<bool> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let session = self.store.get_session(session_id).await?;
        if session.is_completed() {
            return Ok(false);
        }
        self.store
            .append_turn(session_id, Turn::ended_by_user())
            .await?;
        self.complete(session_id).await
    }

    async fn session_lock(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        self.session_locks
            .lock()
            .await
            .entry(session_id)
            .or_default()
            .clone()
    }

    /// Marks the session completed; `true` only for the call that made the transition.
    async fn complete(&self, session_id: Uuid) -> PortResult<bool> {
        let newly_completed = self.store.mark_completed(session_id).await?;
        if newly_completed {
            info!("Intake session {} completed", session_id);
        }
        // Later callers see the completed status and return before mutating.
        self.session_locks.lock().await.remove(&session_id);
        Ok(newly_completed)
    }
}
