//! crates/intake_core/src/domain.rs
//!
//! Defines the pure, core data structures for the intake conversation and the
//! company search pipeline. These structs are independent of any database or
//! external API format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The note stored on the terminal system turn when a user ends the conversation.
pub const USER_ENDED_NOTE: &str = "Conversation ended by user.";

/// The business status the places collaborator reports for closed companies.
pub const PERMANENTLY_CLOSED: &str = "CLOSED_PERMANENTLY";

//=========================================================================================
// Conversation
//=========================================================================================

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    User,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::User => "user",
            Role::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "assistant" => Some(Role::Assistant),
            "user" => Some(Role::User),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// A single message in a session's transcript.
///
/// Assistant turns carry a question and an empty answer, user turns carry an
/// answer and an empty question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn assistant(question: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            question: question.into(),
            answer: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(answer: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            question: String::new(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }

    /// The terminal marker appended when the user ends the conversation.
    pub fn ended_by_user() -> Self {
        Self {
            role: Role::System,
            question: String::new(),
            answer: USER_ENDED_NOTE.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// One end-to-end conversation with a single respondent.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Number of questions the assistant has issued so far.
pub fn assistant_turn_count(turns: &[Turn]) -> usize {
    turns.iter().filter(|t| t.role == Role::Assistant).count()
}

/// The question the respondent still owes an answer to.
///
/// When every question has been answered this is the most recent question, and
/// `None` only for an empty transcript.
pub fn pending_question(turns: &[Turn]) -> Option<&str> {
    let questions: Vec<&str> = turns
        .iter()
        .filter(|t| t.role == Role::Assistant)
        .map(|t| t.question.as_str())
        .collect();
    let answered = turns.iter().filter(|t| t.role == Role::User).count();

    questions
        .get(answered)
        .or_else(|| questions.last())
        .copied()
}

/// A question and the answer that immediately followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Pairs each assistant turn with the user turn directly after it.
pub fn qa_pairs(turns: &[Turn]) -> Vec<QaPair> {
    turns
        .windows(2)
        .filter(|w| w[0].role == Role::Assistant && w[1].role == Role::User)
        .map(|w| QaPair {
            question: w[0].question.clone(),
            answer: w[1].answer.clone(),
        })
        .collect()
}

/// A role-tagged message sent to the generative model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

//=========================================================================================
// Search
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A latitude/longitude rectangle used to restrict a places search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, half_width_degrees: f64) -> Self {
        Self {
            min_latitude: center.latitude - half_width_degrees,
            max_latitude: center.latitude + half_width_degrees,
            min_longitude: center.longitude - half_width_degrees,
            max_longitude: center.longitude + half_width_degrees,
        }
    }
}

/// A normalized company record returned by the places collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub primary_type: Option<String>,
    pub types: Vec<String>,
    pub business_status: Option<String>,
    pub maps_url: Option<String>,
    pub website: Option<String>,
    pub national_phone: Option<String>,
    pub international_phone: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
}

impl Place {
    pub fn is_permanently_closed(&self) -> bool {
        self.business_status.as_deref() == Some(PERMANENTLY_CLOSED)
    }
}

/// One page of results from the places collaborator.
#[derive(Debug, Clone, Default)]
pub struct PlacesPage {
    pub places: Vec<Place>,
    pub next_page_token: Option<String>,
}

/// A single text-search request to the places collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacesQuery {
    pub text: String,
    pub restriction: Option<BoundingBox>,
    pub page_token: Option<String>,
    pub page_size: u32,
}

/// Outcome of the searches for one application.
///
/// Variants are ordered by precedence: the aggregate status of an application
/// is the highest status any of its queries produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchStatus {
    ZeroResults,
    Error,
    Ok,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStatus::ZeroResults => "ZERO_RESULTS",
            SearchStatus::Error => "ERROR",
            SearchStatus::Ok => "OK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ZERO_RESULTS" => Some(SearchStatus::ZeroResults),
            "ERROR" => Some(SearchStatus::Error),
            "OK" => Some(SearchStatus::Ok),
            _ => None,
        }
    }
}

/// The queries, matched places and status gathered for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryEntry {
    pub application: String,
    pub queries: Vec<String>,
    pub places: Vec<Place>,
    pub status: SearchStatus,
}

//=========================================================================================
// Persisted results
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPhone {
    pub national: Option<String>,
    pub international: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A company as it is persisted in an application document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: Option<String>,
    pub address: Option<String>,
    pub location: CompanyLocation,
    pub phone: CompanyPhone,
    pub website: Option<String>,
    pub google_maps_url: Option<String>,
    pub rating: Option<f64>,
    pub user_rating_count: Option<u32>,
    pub types: Vec<String>,
    pub status: Option<String>,
}

impl From<&Place> for Company {
    fn from(place: &Place) -> Self {
        Self {
            name: place.name.clone(),
            address: place.address.clone(),
            location: CompanyLocation {
                latitude: place.location.map(|l| l.latitude),
                longitude: place.location.map(|l| l.longitude),
            },
            phone: CompanyPhone {
                national: place.national_phone.clone(),
                international: place.international_phone.clone(),
            },
            website: place.website.clone(),
            google_maps_url: place.maps_url.clone(),
            rating: place.rating,
            user_rating_count: place.rating_count,
            types: place.types.clone(),
            status: place.business_status.clone(),
        }
    }
}

/// The document stored per application, keyed by `application`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application: String,
    pub search_terms: Vec<String>,
    pub companies: Vec<Company>,
    pub status: SearchStatus,
    pub updated_at: DateTime<Utc>,
}
