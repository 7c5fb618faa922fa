use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub name: String,
    pub content: Value,
    pub template: String,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OptimizationHistoryRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub optimization_kind: String,
    pub before_content: Value,
    pub after_content: Value,
    pub ai_suggestions: Value,
    pub created_at: DateTime<Utc>,
}
