use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a queued AI request. Forward-only:
/// `Pending -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "ai_request_type", rename_all = "lowercase")]
pub enum RequestType {
    Suggestions,
    Correction,
    Optimization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsPayload {
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPayload {
    pub resume_id: Uuid,
    #[serde(default = "default_optimization_kind")]
    pub optimization_kind: String,
}

fn default_optimization_kind() -> String {
    "general".to_string()
}

/// Variant-specific task input. Tagged by `request_type` on the wire;
/// only the bare variant object is persisted in the job row's `payload`
/// column (the row's own `request_type` column carries the tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request_type", content = "payload", rename_all = "snake_case")]
pub enum TaskPayload {
    Suggestions(SuggestionsPayload),
    Correction(CorrectionPayload),
    Optimization(OptimizationPayload),
}

impl TaskPayload {
    pub fn request_type(&self) -> RequestType {
        match self {
            TaskPayload::Suggestions(_) => RequestType::Suggestions,
            TaskPayload::Correction(_) => RequestType::Correction,
            TaskPayload::Optimization(_) => RequestType::Optimization,
        }
    }

    /// The bare variant payload, as persisted in the `payload` column.
    pub fn payload_value(&self) -> Value {
        let value = match self {
            TaskPayload::Suggestions(p) => serde_json::to_value(p),
            TaskPayload::Correction(p) => serde_json::to_value(p),
            TaskPayload::Optimization(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }

    /// Reassembles the union from a stored row's `request_type` + `payload`.
    pub fn from_parts(request_type: RequestType, payload: Value) -> Result<Self, serde_json::Error> {
        match request_type {
            RequestType::Suggestions => serde_json::from_value(payload).map(TaskPayload::Suggestions),
            RequestType::Correction => serde_json::from_value(payload).map(TaskPayload::Correction),
            RequestType::Optimization => {
                serde_json::from_value(payload).map(TaskPayload::Optimization)
            }
        }
    }

    /// Field-level checks applied at the dispatch boundary, before any
    /// state is touched.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TaskPayload::Suggestions(p) if p.job_description.trim().is_empty() => {
                Err("job_description is required for suggestions requests".to_string())
            }
            TaskPayload::Correction(p) if p.text.trim().is_empty() => {
                Err("text is required for correction requests".to_string())
            }
            TaskPayload::Optimization(p) if p.optimization_kind.trim().is_empty() => {
                Err("optimization_kind must not be blank".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Variant-specific output stored on a completed job. The three shapes
/// share no field names, so the union is untagged on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Suggestions { suggestions: Vec<String> },
    Correction { corrected_text: String },
    Optimization { message: String, optimization_kind: String },
}

impl TaskResult {
    pub fn matches(&self, request_type: RequestType) -> bool {
        matches!(
            (self, request_type),
            (TaskResult::Suggestions { .. }, RequestType::Suggestions)
                | (TaskResult::Correction { .. }, RequestType::Correction)
                | (TaskResult::Optimization { .. }, RequestType::Optimization)
        )
    }
}

/// One row of `ai_request_queue`. `update_token` is the capability required
/// by the external status-update endpoint; it is skipped on serialization so
/// status polls never leak it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QueueJobRow {
    pub id: Uuid,
    pub user_id: String,
    pub request_type: RequestType,
    pub payload: Value,
    pub status: JobStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(skip_serializing)]
    pub update_token: Uuid,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QueueStats {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub today: i64,
}

/// Fields applied by a conditional status transition.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
}
