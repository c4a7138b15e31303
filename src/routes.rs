use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    auth::{AuthError, Authenticator, parse_basic_auth},
    gemini::{GenerationClient, GenerationError},
    models::{Credentials, ErrorBody, LessonPlanInput, LessonPlanResponse, LoginResponse, ValidationError},
};

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<GenerationClient>,
    pub auth: Arc<Authenticator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/lesson-plan", post(generate_lesson_plan))
        .route("/api/lesson-plan/pdf", post(export_pdf))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    Validation(ValidationError),
    Auth(AuthError),
    Generation(GenerationError),
    NotImplemented(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self { ApiError::Validation(e) }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized,
            other => ApiError::Auth(other),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self { ApiError::Generation(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, AuthError::InvalidCredentials.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Auth(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Generation(e @ GenerationError::Configuration(_)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Generation(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = payload?;
    state.auth.authenticate(&body).await?;
    Ok(Json(LoginResponse { authenticated: true, username: body.username }))
}

async fn require_credentials(auth: &Authenticator, headers: &HeaderMap) -> Result<(), ApiError> {
    if auth.is_open() {
        return Ok(());
    }
    let credentials = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth)
        .ok_or(ApiError::Unauthorized)?;
    auth.authenticate(&credentials).await?;
    Ok(())
}

pub async fn generate_lesson_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LessonPlanInput>, JsonRejection>,
) -> Result<Json<LessonPlanResponse>, ApiError> {
    require_credentials(&state.auth, &headers).await?;
    let Json(body) = payload?;
    body.validate()?;

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "🚀 Generating lesson plan for topic: {} ({})", body.topic, body.grade_level);

    let lesson_plan = state.generator.generate(&body).await.map_err(|e| {
        tracing::error!(%request_id, "❌ Error generating lesson plan: {}", e);
        e
    })?;

    Ok(Json(LessonPlanResponse { request_id, lesson_plan, generated_at: Utc::now() }))
}

pub async fn export_pdf() -> ApiError {
    ApiError::NotImplemented("PDF download functionality will be available soon!")
}
