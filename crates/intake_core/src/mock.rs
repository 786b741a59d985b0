//! crates/intake_core/src/mock.rs
//!
//! Scriptable doubles for the model, places and geocoding ports, so the engine
//! and the pipeline can be exercised without calling real APIs.
//!
//! Each double hands out pre-configured responses in order, records the calls
//! it receives, and falls back to a harmless default once the script runs out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ChatMessage, GeoPoint, Place, PlacesPage, PlacesQuery};
use crate::ports::{
    ChatModelService, GeocodingService, PlacesSearchService, PortError, PortResult,
    StructuredGenerationService,
};
use crate::schema::StringListSchema;

/// Failure modes a double can be scripted to produce.
#[derive(Debug, Clone)]
pub enum MockError {
    Unavailable(String),
    Timeout,
    InvalidResponse(String),
}

impl From<MockError> for PortError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::Unavailable(message) => PortError::Unexpected(message),
            MockError::Timeout => PortError::Timeout("mock timeout".to_string()),
            MockError::InvalidResponse(message) => PortError::InvalidResponse(message),
        }
    }
}

type Script<T> = Arc<Mutex<VecDeque<Result<T, MockError>>>>;

fn next_from<T>(script: &Script<T>) -> Option<Result<T, MockError>> {
    script.lock().unwrap().pop_front()
}

//=========================================================================================
// Chat model
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct MockChatModel {
    responses: Script<String>,
    delay: Duration,
    calls: Arc<Mutex<Vec<(Vec<ChatMessage>, f32)>>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(content.into()));
        self
    }

    pub fn with_error(self, error: MockError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every message sequence received, with the temperature it was sent at.
    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModelService for MockChatModel {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> PortResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match next_from(&self.responses) {
            Some(Ok(content)) => Ok(content),
            Some(Err(e)) => Err(e.into()),
            None => Ok("Are you open to distributors?".to_string()),
        }
    }
}

//=========================================================================================
// Structured model
//=========================================================================================

/// Answers structured calls with scripted lists.
///
/// Responses keyed by a prompt fragment take priority over the ordered script,
/// which keeps concurrent callers deterministic.
#[derive(Debug, Clone, Default)]
pub struct MockStructuredModel {
    responses: Script<Vec<String>>,
    by_fragment: Arc<Mutex<Vec<(String, Result<Vec<String>, MockError>)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockStructuredModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list<I, S>(self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = items.into_iter().map(Into::into).collect();
        self.responses.lock().unwrap().push_back(Ok(list));
        self
    }

    pub fn with_error(self, error: MockError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Answers any prompt containing `fragment` with `items`.
    pub fn with_list_for<I, S>(self, fragment: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = items.into_iter().map(Into::into).collect();
        self.by_fragment
            .lock()
            .unwrap()
            .push((fragment.into(), Ok(list)));
        self
    }

    /// Fails any prompt containing `fragment`.
    pub fn with_error_for(self, fragment: impl Into<String>, error: MockError) -> Self {
        self.by_fragment
            .lock()
            .unwrap()
            .push((fragment.into(), Err(error)));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredGenerationService for MockStructuredModel {
    async fn generate_list(&self, prompt: &str, _schema: &StringListSchema) -> PortResult<Vec<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let keyed = self
            .by_fragment
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());

        match keyed.or_else(|| next_from(&self.responses)) {
            Some(Ok(list)) => Ok(list),
            Some(Err(e)) => Err(e.into()),
            None => Ok(Vec::new()),
        }
    }
}

//=========================================================================================
// Places
//=========================================================================================

/// Serves scripted result pages per query text.
///
/// Pages for one query are returned in order; the searcher follows
/// `next_page_token` which the double sets whenever more pages remain.
#[derive(Debug, Clone, Default)]
pub struct MockPlacesService {
    pages: Arc<Mutex<HashMap<String, VecDeque<Result<Vec<Place>, MockError>>>>>,
    requests: Arc<Mutex<Vec<PlacesQuery>>>,
}

impl MockPlacesService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, query: impl Into<String>, places: Vec<Place>) -> Self {
        self.push(query.into(), Ok(places));
        self
    }

    pub fn with_error(self, query: impl Into<String>, error: MockError) -> Self {
        self.push(query.into(), Err(error));
        self
    }

    fn push(&self, query: String, page: Result<Vec<Place>, MockError>) {
        self.pages
            .lock()
            .unwrap()
            .entry(query)
            .or_default()
            .push_back(page);
    }

    pub fn requests(&self) -> Vec<PlacesQuery> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlacesSearchService for MockPlacesService {
    async fn search_text(&self, query: &PlacesQuery) -> PortResult<PlacesPage> {
        self.requests.lock().unwrap().push(query.clone());

        let mut pages = self.pages.lock().unwrap();
        let Some(queue) = pages.get_mut(&query.text) else {
            return Ok(PlacesPage::default());
        };

        match queue.pop_front() {
            Some(Ok(places)) => {
                let next_page_token = (!queue.is_empty())
                    .then(|| format!("{}#{}", query.text, queue.len()));
                Ok(PlacesPage {
                    places,
                    next_page_token,
                })
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(PlacesPage::default()),
        }
    }
}

/// A place record with just the fields tests usually care about.
pub fn place(id: &str, name: &str) -> Place {
    Place {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        business_status: Some("OPERATIONAL".to_string()),
        ..Place::default()
    }
}

//=========================================================================================
// Geocoding
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct MockGeocoder {
    known: Arc<Mutex<HashMap<String, GeoPoint>>>,
    failing: bool,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(self, name: impl Into<String>, point: GeoPoint) -> Self {
        self.known.lock().unwrap().insert(name.into(), point);
        self
    }

    /// Makes every lookup fail with a transport error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeocodingService for MockGeocoder {
    async fn geocode(&self, location: &str) -> PortResult<Option<GeoPoint>> {
        self.lookups.lock().unwrap().push(location.to_string());
        if self.failing {
            return Err(PortError::Unexpected("geocoder unavailable".to_string()));
        }
        Ok(self.known.lock().unwrap().get(location).copied())
    }
}
