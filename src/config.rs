use std::fmt;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Gemini API key is not configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for the Gemini text-generation endpoint.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// Keep the key out of logs.
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    None,
    Static { username: String, password: String },
    External { url: String },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::None => write!(f, "None"),
            AuthConfig::Static { username, .. } => f.debug_struct("Static").field("username", username).field("password", &"***").finish(),
            AuthConfig::External { url } => f.debug_struct("External").field("url", url).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub auth: AuthConfig,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut gemini = GeminiConfig::new(api_key);
        if let Some(base) = get("GEMINI_API_BASE") {
            gemini = gemini.with_base_url(base.trim_end_matches('/'));
        }
        if let Some(model) = get("GEMINI_MODEL") {
            gemini = gemini.with_model(model);
        }

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key: "PORT", value: v })?,
            None => DEFAULT_PORT,
        };

        let auth = match get("AUTH_MODE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("none") => AuthConfig::None,
            Some("static") | None => AuthConfig::Static {
                username: get("AUTH_USERNAME").ok_or(ConfigError::Missing("AUTH_USERNAME"))?,
                password: get("AUTH_PASSWORD").ok_or(ConfigError::Missing("AUTH_PASSWORD"))?,
            },
            Some("external") => AuthConfig::External {
                url: get("AUTH_PROVIDER_URL").ok_or(ConfigError::Missing("AUTH_PROVIDER_URL"))?,
            },
            Some(other) => return Err(ConfigError::Invalid { key: "AUTH_MODE", value: other.to_string() }),
        };

        Ok(Self { gemini, auth, port })
    }
}
