use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One row of `ai_response_cache`, keyed by the content hash of the
/// normalized task input. Expiry is enforced by readers, not by deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CacheEntryRow {
    pub prompt_hash: String,
    pub response: Value,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
