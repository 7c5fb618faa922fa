//! Axum route handlers for the AI task queue API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{QueueJobRow, QueueStats};
use crate::queue::dispatch::{self, DispatchRequest, DispatchResponse, UpdateStatusRequest};
use crate::queue::processor::{self, BatchSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub jobs: Vec<QueueJobRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/dispatch
///
/// Submits an AI task. Returns a queued-job handle when the automation
/// server is reachable, or the completed result inline when it is not.
/// The body is deserialized in two steps so tagged-union mismatches surface
/// as a structured validation error rather than a bare rejection.
pub async fn handle_dispatch(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<DispatchResponse>, AppError> {
    let request: DispatchRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid dispatch request: {e}")))?;

    let response = dispatch::dispatch(
        state.queue.as_ref(),
        state.cache.as_ref(),
        state.ai.as_ref(),
        state.probe.as_ref(),
        request,
    )
    .await?;

    Ok(Json(response))
}

/// GET /api/v1/ai/status?job_id=...
///
/// Polls one job. Unknown ids are a 404 outcome, not a processing error.
pub async fn handle_job_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<QueueJobRow>, AppError> {
    let job = state.queue.get(query.job_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("No queued request with id {}", query.job_id))
    })?;

    Ok(Json(job))
}

/// PUT /api/v1/ai/status
///
/// Lets the external automation server report a job transition. Requires the
/// capability token issued at enqueue time.
pub async fn handle_update_status(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<QueueJobRow>, AppError> {
    let request: UpdateStatusRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid status update: {e}")))?;

    let job = dispatch::update_status(state.queue.as_ref(), request).await?;
    Ok(Json(job))
}

/// POST /api/v1/ai/process
///
/// Runs one batch over the pending queue. Triggered externally; the service
/// never schedules this itself.
pub async fn handle_run_batch(
    State(state): State<AppState>,
) -> Result<Json<BatchSummary>, AppError> {
    let summary = processor::run_batch(
        state.queue.as_ref(),
        state.cache.as_ref(),
        state.ai.as_ref(),
    )
    .await?;

    Ok(Json(summary))
}

/// GET /api/v1/ai/queue/stats
pub async fn handle_queue_stats(
    State(state): State<AppState>,
) -> Result<Json<QueueStats>, AppError> {
    Ok(Json(state.queue.stats().await?))
}

/// POST /api/v1/ai/queue/cleanup
///
/// Sweeps terminal jobs past the retention window and returns them.
pub async fn handle_queue_cleanup(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let jobs = state.queue.cleanup().await?;
    info!(removed = jobs.len(), "Queue cleanup finished");

    Ok(Json(CleanupResponse {
        removed: jobs.len(),
        jobs,
    }))
}
