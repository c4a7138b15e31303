use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Form payload for a single lesson plan. Only `topic` and `grade_level` are required.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanInput {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub main_concept: String,
    #[serde(default)]
    pub materials: String,
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub outline: String,
    #[serde(default)]
    pub notes: String, // collected but never sent to the model
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Topic and Grade Level are required fields")]
    MissingRequired,
}

impl LessonPlanInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() || self.grade_level.trim().is_empty() {
            return Err(ValidationError::MissingRequired);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanResponse {
    pub request_id: Uuid,
    pub lesson_plan: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginResponse {
    pub authenticated: bool,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}
