use crate::{config::GeminiConfig, models::LessonPlanInput, prompt::build_prompt};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Configuration(String),
    #[error("API Error: {message}")]
    Service { status: u16, message: String },
    #[error("Invalid response format from API: {0}")]
    Format(String),
    #[error("HTTP error: {0}")]
    Transport(String),
}

/// Lifecycle of a single generation request. There is no retry edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationState::Idle => "idle",
            GenerationState::InFlight => "in_flight",
            GenerationState::Succeeded => "succeeded",
            GenerationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Performs the outbound POST. Production uses reqwest; tests substitute their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, GenerationError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, GenerationError> {
        let response = self.client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

pub struct GenerationClient {
    transport: Arc<dyn Transport>,
    config: GeminiConfig,
}

impl GenerationClient {
    /// Fails up front when the API key is empty; the transport is not touched.
    pub fn new(config: GeminiConfig, transport: Arc<dyn Transport>) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Configuration("Gemini API key is not configured".into()));
        }
        Ok(Self { transport, config })
    }

    pub fn with_reqwest(config: GeminiConfig) -> Result<Self, GenerationError> {
        Self::new(config, Arc::new(ReqwestTransport::new()))
    }

    fn endpoint(&self) -> Result<Url, GenerationError> {
        let base = format!("{}/models/{}:generateContent", self.config.base_url, self.config.model);
        Url::parse_with_params(&base, &[("key", self.config.api_key.as_str())])
            .map_err(|e| GenerationError::Configuration(format!("invalid Gemini endpoint {}: {}", base, e)))
    }

    /// Generates a lesson plan. Callers must have validated `input` first.
    pub async fn generate(&self, input: &LessonPlanInput) -> Result<String, GenerationError> {
        let prompt = build_prompt(input);
        self.generate_text(&prompt).await
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut state = GenerationState::Idle;
        let url = self.endpoint()?;
        let payload = serde_json::to_vec(&GenerateContentRequest::from_prompt(prompt))
            .map_err(|e| GenerationError::Format(e.to_string()))?;

        info!(%state, base_url = %self.config.base_url, model = %self.config.model, "🔗 Making generateContent request");
        state = GenerationState::InFlight;
        info!(%state, prompt_chars = prompt.len(), "📤 Sending generateContent request");

        let result = match self.transport.post_json(url.as_str(), payload).await {
            Ok(response) => parse_response(&response),
            Err(e) => Err(e),
        };

        match &result {
            Ok(text) => {
                state = GenerationState::Succeeded;
                info!(%state, "✅ Lesson plan generated ({} chars)", text.len());
            }
            Err(e) => {
                state = GenerationState::Failed;
                error!(%state, "❌ Lesson plan generation failed: {}", e);
            }
        }
        result
    }
}

fn parse_response(response: &TransportResponse) -> Result<String, GenerationError> {
    info!("📥 Response status: {}", response.status);

    if !(200..300).contains(&response.status) {
        let message = serde_json::from_slice::<ErrorEnvelope>(&response.body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(GenerationError::Service { status: response.status, message });
    }

    let parsed: GenerateContentResponse = serde_json::from_slice(&response.body)
        .map_err(|e| GenerationError::Format(format!("parse error: {}", e)))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GenerationError::Format("no candidate text in response".into()))
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self { contents: vec![RequestContent { parts: vec![RequestPart { text: prompt }] }] }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
