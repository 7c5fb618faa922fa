//! Durable store of AI request jobs.
//!
//! Single-statement conditional updates are the only synchronization in the
//! subsystem: `claim` and `set_status_from` express their compare-and-swap
//! in one `UPDATE ... WHERE ... RETURNING`, so racing batch runs and the
//! external status reporter arbitrate at the row level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobStatus, QueueJobRow, QueueStats, RequestType, StatusUpdate};

/// Terminal jobs older than this are removed by the cleanup sweep.
pub const RETENTION_DAYS: i32 = 30;

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Inserts a new `Pending` job and returns the stored record, including
    /// the generated id, capability token, and `created_at`.
    async fn enqueue(
        &self,
        request_type: RequestType,
        payload: Value,
        user_id: &str,
    ) -> Result<QueueJobRow, AppError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<QueueJobRow>, AppError>;

    /// Up to `limit` claimable jobs, oldest `created_at` first: every
    /// `Pending` job plus any `Processing` job whose lease has expired.
    async fn list_pending(&self, limit: i64) -> Result<Vec<QueueJobRow>, AppError>;

    /// Atomically moves a claimable job to `Processing` under the given
    /// lease. `None` means another claimer won the race (or the job is no
    /// longer claimable) and the caller must skip it.
    async fn claim(
        &self,
        job_id: Uuid,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<Option<QueueJobRow>, AppError>;

    /// Conditional partial update: applies `update` only if the job's
    /// current status equals `expected`. Terminal targets set
    /// `processed_at` and clear the lease. `None` means the expectation
    /// failed and nothing changed.
    async fn set_status_from(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<Option<QueueJobRow>, AppError>;

    async fn stats(&self) -> Result<QueueStats, AppError>;

    /// Deletes and returns terminal jobs older than [`RETENTION_DAYS`].
    /// Non-terminal jobs survive regardless of age.
    async fn cleanup(&self) -> Result<Vec<QueueJobRow>, AppError>;
}

pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn enqueue(
        &self,
        request_type: RequestType,
        payload: Value,
        user_id: &str,
    ) -> Result<QueueJobRow, AppError> {
        Ok(sqlx::query_as::<_, QueueJobRow>(
            r#"
            INSERT INTO ai_request_queue (id, user_id, request_type, payload, update_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request_type)
        .bind(payload)
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<QueueJobRow>, AppError> {
        Ok(
            sqlx::query_as::<_, QueueJobRow>("SELECT * FROM ai_request_queue WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<QueueJobRow>, AppError> {
        Ok(sqlx::query_as::<_, QueueJobRow>(
            r#"
            SELECT *
            FROM ai_request_queue
            WHERE status = 'pending'
               OR (status = 'processing' AND lease_expires_at < NOW())
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn claim(
        &self,
        job_id: Uuid,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<Option<QueueJobRow>, AppError> {
        Ok(sqlx::query_as::<_, QueueJobRow>(
            r#"
            UPDATE ai_request_queue
            SET status = 'processing', lease_expires_at = $2
            WHERE id = $1
              AND (status = 'pending'
                   OR (status = 'processing' AND lease_expires_at < NOW()))
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(lease_expires_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_status_from(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<Option<QueueJobRow>, AppError> {
        let terminal = update.status.is_terminal();
        Ok(sqlx::query_as::<_, QueueJobRow>(
            r#"
            UPDATE ai_request_queue
            SET status = $3,
                result = $4,
                error = $5,
                processed_at = CASE WHEN $6 THEN NOW() ELSE processed_at END,
                lease_expires_at = CASE WHEN $6 THEN NULL ELSE lease_expires_at END
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(expected)
        .bind(update.status)
        .bind(update.result)
        .bind(update.error)
        .bind(terminal)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn stats(&self) -> Result<QueueStats, AppError> {
        Ok(sqlx::query_as::<_, QueueStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE created_at::date = CURRENT_DATE) AS today
            FROM ai_request_queue
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    async fn cleanup(&self) -> Result<Vec<QueueJobRow>, AppError> {
        Ok(sqlx::query_as::<_, QueueJobRow>(
            r#"
            DELETE FROM ai_request_queue
            WHERE status IN ('completed', 'failed')
              AND created_at < NOW() - make_interval(days => $1)
            RETURNING *
            "#,
        )
        .bind(RETENTION_DAYS)
        .fetch_all(&self.pool)
        .await?)
    }
}
