//! HTTP-level tests for the intake API, run against the in-memory stores and
//! scripted collaborators from `intake_core`.

use std::sync::Arc;
use std::time::Duration;

use api_lib::web::{router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use intake_core::{
    engine::OPENING_QUESTION,
    memory::{InMemoryResultStore, InMemoryTranscriptStore},
    mock::{place, MockChatModel, MockGeocoder, MockPlacesService, MockStructuredModel},
    pipeline::SearchConfig,
    ConversationEngine, EngineConfig, IntakeService, PipelineConfig, ResultStore, SearchPipeline,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const APPLICATION: &str = "coupling agent for hemp decking";
const APPLICATION_PATH: &str = "/applications/coupling%20agent%20for%20hemp%20decking";

struct TestApp {
    router: Router,
    results: Arc<InMemoryResultStore>,
    structured: MockStructuredModel,
}

fn test_app() -> TestApp {
    let transcripts = Arc::new(InMemoryTranscriptStore::new());
    let results = Arc::new(InMemoryResultStore::new());
    let structured = MockStructuredModel::new()
        .with_list_for("CONVERSATION:", [APPLICATION])
        .with_list_for(APPLICATION, ["hemp decking compounder"]);
    let places = MockPlacesService::new().with_page(
        "hemp decking compounder",
        vec![place("p1", "Deck Compounds"), place("p2", "Fiber Works")],
    );

    let engine = ConversationEngine::new(Arc::new(MockChatModel::new()), EngineConfig::default());
    let pipeline = SearchPipeline::new(
        Arc::new(structured.clone()),
        Arc::new(places),
        Arc::new(MockGeocoder::new()),
        results.clone(),
        PipelineConfig {
            search: SearchConfig {
                page_delay: Duration::ZERO,
                ..SearchConfig::default()
            },
            ..PipelineConfig::default()
        },
    );

    let state = Arc::new(AppState {
        intake: Arc::new(IntakeService::new(transcripts, engine)),
        results: results.clone(),
        pipeline: Arc::new(pipeline),
    });

    TestApp {
        router: router(state),
        results,
        structured,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn start_session(app: &TestApp) -> String {
    let (status, body) = send(app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

async fn wait_for_results(app: &TestApp) {
    for _ in 0..200 {
        if app.results.get_application(APPLICATION).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pipeline never stored results");
}

#[tokio::test]
async fn new_session_opens_with_the_fixed_question() {
    let app = test_app();
    let (status, body) = send(&app, "POST", "/sessions", None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["question"], OPENING_QUESTION);

    let id = body["session_id"].as_str().unwrap();
    let (status, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["status"], "active");
    assert_eq!(session["question"], OPENING_QUESTION);
    assert_eq!(session["turns"].as_array().unwrap().len(), 1);
    assert_eq!(session["turns"][0]["role"], "assistant");
}

#[tokio::test]
async fn answering_returns_the_next_question() {
    let app = test_app();
    let id = start_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({ "answer": "A maleic anhydride grafted polypropylene." })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["question"], "Are you open to distributors?");

    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["turns"].as_array().unwrap().len(), 3);
    assert_eq!(session["question"], "Are you open to distributors?");
}

#[tokio::test]
async fn blank_answer_re_asks_the_pending_question() {
    let app = test_app();
    let id = start_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({ "answer": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], OPENING_QUESTION);
    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["turns"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_answer_field_re_asks_the_pending_question() {
    let app = test_app();
    let id = start_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["question"], OPENING_QUESTION);
    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["turns"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn ending_a_session_runs_the_pipeline_once() {
    let app = test_app();
    let id = start_session(&app).await;
    send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({ "answer": "A coupling agent for natural fibre composites." })),
    )
    .await;

    let (status, body) = send(&app, "POST", &format!("/sessions/{}/end", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    wait_for_results(&app).await;
    let (status, stored) = send(&app, "GET", APPLICATION_PATH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "OK");
    assert_eq!(stored["search_terms"], json!(["hemp decking compounder"]));
    assert_eq!(stored["companies"].as_array().unwrap().len(), 2);
    assert_eq!(stored["companies"][0]["name"], "Deck Compounds");

    // Extraction plus one query-generation call.
    let prompts_after_first_run = app.structured.prompts().len();
    assert_eq!(prompts_after_first_run, 2);

    // Ending again, or answering afterwards, launches nothing new.
    let (status, body) = send(&app, "POST", &format!("/sessions/{}/end", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    let (_, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({ "answer": "One more thing" })),
    )
    .await;
    assert_eq!(body["status"], "completed");
    assert!(body.get("question").is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.structured.prompts().len(), prompts_after_first_run);

    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    let turns = session["turns"].as_array().unwrap();
    assert_eq!(session["status"], "completed");
    assert_eq!(turns.last().unwrap()["role"], "system");
    assert_eq!(turns.last().unwrap()["answer"], "Conversation ended by user.");
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = test_app();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/sessions/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", missing),
        Some(json!({ "answer": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/end", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", APPLICATION_PATH, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_session_id_is_rejected() {
    let app = test_app();
    let (status, _) = send(&app, "GET", "/sessions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
