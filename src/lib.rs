pub mod auth;
pub mod config;
pub mod gemini;
pub mod models;
pub mod prompt;
pub mod routes;

pub use config::{AppConfig, GeminiConfig};
pub use gemini::{GenerationClient, GenerationError};
pub use models::LessonPlanInput;
