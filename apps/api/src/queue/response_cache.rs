//! Deduplicating cache of AI responses, keyed by content hash of the task
//! input. Shared by the direct dispatch path and the batch processor.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::cache::CacheEntryRow;

/// Entries are served for this long after creation; the reader masks
/// anything older.
pub const CACHE_TTL_HOURS: i32 = 24;

/// Content-addressed key for a task input: SHA-256 over the task kind and
/// the whitespace-normalized text, hex encoded. The kind prefix keeps
/// identical text under different task kinds from colliding.
pub fn prompt_hash(kind: &str, input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(normalize(input).as_bytes());
    hex::encode(hasher.finalize())
}

/// Trims and collapses whitespace runs so formatting differences do not
/// defeat deduplication.
fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Unexpired entry for the hash, if any. Expiry is enforced here by the
    /// reader; expired rows are simply treated as absent.
    async fn lookup(&self, prompt_hash: &str) -> Result<Option<CacheEntryRow>, AppError>;

    /// Upserts the response under the hash with a fresh expiry of
    /// [`CACHE_TTL_HOURS`] from now.
    async fn store(
        &self,
        prompt_hash: &str,
        response: Value,
        model: &str,
    ) -> Result<CacheEntryRow, AppError>;
}

pub struct PgResponseCache {
    pool: PgPool,
}

impl PgResponseCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResponseCache for PgResponseCache {
    async fn lookup(&self, prompt_hash: &str) -> Result<Option<CacheEntryRow>, AppError> {
        Ok(sqlx::query_as::<_, CacheEntryRow>(
            "SELECT * FROM ai_response_cache WHERE prompt_hash = $1 AND expires_at > NOW()",
        )
        .bind(prompt_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn store(
        &self,
        prompt_hash: &str,
        response: Value,
        model: &str,
    ) -> Result<CacheEntryRow, AppError> {
        Ok(sqlx::query_as::<_, CacheEntryRow>(
            r#"
            INSERT INTO ai_response_cache (prompt_hash, response, model, expires_at)
            VALUES ($1, $2, $3, NOW() + make_interval(hours => $4))
            ON CONFLICT (prompt_hash)
            DO UPDATE SET response = EXCLUDED.response,
                          model = EXCLUDED.model,
                          expires_at = EXCLUDED.expires_at
            RETURNING *
            "#,
        )
        .bind(prompt_hash)
        .bind(response)
        .bind(model)
        .bind(CACHE_TTL_HOURS)
        .fetch_one(&self.pool)
        .await?)
    }
}
