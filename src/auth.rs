use crate::{config::AuthConfig, models::Credentials};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(false)` means the provider answered and rejected the credentials.
    async fn verify(&self, credentials: &Credentials) -> Result<bool, AuthError>;
}

pub enum Authenticator {
    None,
    StaticCredential { username: String, password: String },
    ExternalIdentityProvider(Arc<dyn IdentityProvider>),
}

impl Authenticator {
    pub fn from_config(config: &AuthConfig) -> Self {
        match config {
            AuthConfig::None => Authenticator::None,
            AuthConfig::Static { username, password } => Authenticator::StaticCredential {
                username: username.clone(),
                password: password.clone(),
            },
            AuthConfig::External { url } => {
                Authenticator::ExternalIdentityProvider(Arc::new(HttpIdentityProvider::new(url.clone())))
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Authenticator::None)
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let accepted = match self {
            Authenticator::None => true,
            Authenticator::StaticCredential { username, password } => {
                credentials.username == *username && credentials.password == *password
            }
            Authenticator::ExternalIdentityProvider(provider) => provider.verify(credentials).await?,
        };
        if accepted {
            info!("🔓 Login accepted for {}", credentials.username);
            Ok(())
        } else {
            warn!("🔒 Login rejected for {}", credentials.username);
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Verifies credentials by POSTing them as JSON to an external endpoint.
pub struct HttpIdentityProvider {
    client: Client,
    url: String,
}

impl HttpIdentityProvider {
    pub fn new(url: String) -> Self {
        Self { client: Client::new(), url }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, credentials: &Credentials) -> Result<bool, AuthError> {
        let response = self.client
            .post(&self.url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            Ok(false)
        } else {
            Err(AuthError::Provider(format!("unexpected status {}", status)))
        }
    }
}

/// Parses an `Authorization: Basic ...` header value.
pub fn parse_basic_auth(header: &str) -> Option<Credentials> {
    let encoded = header.strip_prefix("Basic ").or_else(|| header.strip_prefix("basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials { username: username.to_string(), password: password.to_string() })
}
