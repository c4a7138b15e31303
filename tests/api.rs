use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use lesson_planner::{
    auth::Authenticator,
    gemini::{ReqwestTransport, Transport, TransportResponse},
    routes::{router, AppState},
    GeminiConfig, GenerationClient, GenerationError, LessonPlanInput,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

struct CannedTransport {
    status: u16,
    body: Value,
    calls: Mutex<usize>,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn post_json(&self, _url: &str, _body: Vec<u8>) -> Result<TransportResponse, GenerationError> {
        *self.calls.lock() += 1;
        Ok(TransportResponse { status: self.status, body: Bytes::from(self.body.to_string()) })
    }
}

fn app_with(status: u16, body: Value, auth: Authenticator) -> (Router, Arc<CannedTransport>) {
    let transport = Arc::new(CannedTransport { status, body, calls: Mutex::new(0) });
    let generator = GenerationClient::new(GeminiConfig::new("test-key"), transport.clone()).unwrap();
    let state = AppState { generator: Arc::new(generator), auth: Arc::new(auth) };
    (router(state), transport)
}

fn static_auth() -> Authenticator {
    Authenticator::StaticCredential { username: "teacher".into(), password: "selected".into() }
}

fn ok_body(text: &str) -> Value {
    json!({"candidates":[{"content":{"parts":[{"text": text}]}}]})
}

fn post_json(uri: &str, body: Value, basic: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(b) = basic {
        builder = builder.header(header::AUTHORIZATION, format!("Basic {b}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// base64("teacher:selected")
const GOOD_BASIC: &str = "dGVhY2hlcjpzZWxlY3RlZA==";

#[tokio::test]
async fn login_accepts_and_rejects() {
    let (app, _) = app_with(200, ok_body("unused"), static_auth());

    let ok = app.clone()
        .oneshot(post_json("/api/login", json!({"username":"teacher","password":"selected"}), None))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(json_body(ok).await, json!({"authenticated": true, "username": "teacher"}));

    let bad = app
        .oneshot(post_json("/api/login", json!({"username":"teacher","password":"nope"}), None))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(bad).await, json!({"error": "Invalid credentials"}));
}

#[tokio::test]
async fn generation_returns_plan() {
    let (app, transport) = app_with(200, ok_body("## Lesson plan"), static_auth());
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"Photosynthesis","gradeLevel":"8th Grade"}), Some(GOOD_BASIC)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["lessonPlan"], "## Lesson plan");
    assert!(body["requestId"].is_string());
    assert!(body["generatedAt"].is_string());
    assert_eq!(*transport.calls.lock(), 1);
}

#[tokio::test]
async fn generation_requires_credentials() {
    let (app, transport) = app_with(200, ok_body("x"), static_auth());
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"t","gradeLevel":"g"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(*transport.calls.lock(), 0);
}

#[tokio::test]
async fn open_gate_skips_credentials() {
    let (app, _) = app_with(200, ok_body("x"), Authenticator::None);
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"t","gradeLevel":"g"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_required_fields_are_rejected_before_calling_out() {
    let (app, transport) = app_with(200, ok_body("x"), static_auth());
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"","gradeLevel":"8th"}), Some(GOOD_BASIC)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Topic and Grade Level are required fields"}));
    assert_eq!(*transport.calls.lock(), 0);
}

#[tokio::test]
async fn upstream_errors_map_to_bad_gateway() {
    let (app, _) = app_with(403, json!({"error":{"message":"quota exceeded"}}), Authenticator::None);
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"t","gradeLevel":"g"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await, json!({"error": "API Error: quota exceeded"}));

    let (app, _) = app_with(200, json!({}), Authenticator::None);
    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":"t","gradeLevel":"g"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn malformed_bodies_get_json_400() {
    let (app, transport) = app_with(200, ok_body("x"), static_auth());

    let response = app.clone()
        .oneshot(post_json("/api/login", json!({"username":"teacher"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("password"), "{body}");

    let response = app
        .oneshot(post_json("/api/lesson-plan", json!({"topic":null,"gradeLevel":"8th"}), Some(GOOD_BASIC)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(*transport.calls.lock(), 0);
}

#[tokio::test]
async fn pdf_export_is_not_implemented() {
    let (app, _) = app_with(200, ok_body("x"), Authenticator::None);
    let response = app
        .oneshot(post_json("/api/lesson-plan/pdf", json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

// --- Real transport against a local stand-in for the Gemini endpoint ---

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(HashMap<String, String>, Option<String>, Value)>>>,
}

async fn fake_generate(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
    seen.requests.lock().push((query.clone(), content_type, body.clone()));
    if query.get("key").map(String::as_str) != Some("live-key") {
        return (StatusCode::FORBIDDEN, Json(json!({"error":{"message":"API key not valid"}})));
    }
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    let first_line = prompt.lines().find(|l| l.starts_with("Topic: ")).unwrap_or_default().to_string();
    (StatusCode::OK, Json(json!({"candidates":[{"content":{"parts":[{"text": first_line}]}}]})))
}

async fn spawn_fake_gemini() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1beta/models/:action", post(fake_generate))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1beta"), seen)
}

fn lesson(topic: &str) -> LessonPlanInput {
    LessonPlanInput { topic: topic.into(), grade_level: "6th".into(), ..Default::default() }
}

#[tokio::test]
async fn reqwest_transport_speaks_the_wire_format() {
    let (base, seen) = spawn_fake_gemini().await;
    let client = GenerationClient::new(
        GeminiConfig::new("live-key").with_base_url(base),
        Arc::new(ReqwestTransport::new()),
    ).unwrap();

    let text = client.generate(&lesson("Ecosystems")).await.unwrap();
    assert_eq!(text, "Topic: Ecosystems");

    let requests = seen.requests.lock();
    assert_eq!(requests.len(), 1);
    let (query, content_type, body) = &requests[0];
    assert_eq!(query.get("key").map(String::as_str), Some("live-key"));
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    assert!(body["contents"][0]["parts"][0]["text"].as_str().unwrap().contains("Grade Level: 6th"));
}

#[tokio::test]
async fn reqwest_transport_surfaces_service_message() {
    let (base, _) = spawn_fake_gemini().await;
    let client = GenerationClient::new(
        GeminiConfig::new("wrong-key").with_base_url(base),
        Arc::new(ReqwestTransport::new()),
    ).unwrap();

    let err = client.generate(&lesson("Ecosystems")).await.unwrap_err();
    assert!(matches!(err, GenerationError::Service { status: 403, .. }));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn concurrent_live_requests_do_not_mix() {
    let (base, seen) = spawn_fake_gemini().await;
    let client = GenerationClient::with_reqwest(GeminiConfig::new("live-key").with_base_url(base)).unwrap();

    let (rivers, fractions) = (lesson("Rivers"), lesson("Fractions"));
    let (a, b) = tokio::join!(client.generate(&rivers), client.generate(&fractions));
    assert_eq!(a.unwrap(), "Topic: Rivers");
    assert_eq!(b.unwrap(), "Topic: Fractions");
    assert_eq!(seen.requests.lock().len(), 2);
}
