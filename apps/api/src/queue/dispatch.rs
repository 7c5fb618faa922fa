//! Dispatch decision and status reporting for AI task requests.
//!
//! A dispatch either enqueues a job for the external automation pipeline or,
//! when that server is unreachable, runs the task inline through the shared
//! cache-or-compute path. Callers see the same result shape either way; the
//! only visible difference is latency and the presence of a job handle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::automation::AutomationProbe;
use crate::errors::AppError;
use crate::llm_client::AiBackend;
use crate::models::job::{JobStatus, QueueJobRow, StatusUpdate, TaskPayload, TaskResult};
use crate::queue::response_cache::{prompt_hash, ResponseCache};
use crate::queue::store::QueueStore;

/// Requests without a user id are attributed to this sentinel.
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    #[serde(flatten)]
    pub task: TaskPayload,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResponse {
    /// The job handle plus the capability token the automation server needs
    /// to report completion. The token appears here and nowhere else.
    Queued {
        job_id: Uuid,
        update_token: Uuid,
        message: String,
    },
    Completed {
        result: TaskResult,
        message: String,
    },
}

/// Reported by the external automation server when it finishes a job.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub job_id: Uuid,
    pub update_token: Uuid,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Single entry point for submitting an AI task.
pub async fn dispatch(
    queue: &dyn QueueStore,
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    probe: &dyn AutomationProbe,
    request: DispatchRequest,
) -> Result<DispatchResponse, AppError> {
    request.task.validate().map_err(AppError::Validation)?;

    let user_id = match request.user_id {
        Some(user) if !user.trim().is_empty() => user,
        _ => ANONYMOUS_USER.to_string(),
    };

    if !probe.is_available().await {
        info!(
            request_type = ?request.task.request_type(),
            "Automation server unavailable, running task inline"
        );
        let result = execute_direct(cache, ai, &request.task).await?;
        return Ok(DispatchResponse::Completed {
            result,
            message: "Processed directly (automation server unavailable)".to_string(),
        });
    }

    let job = queue
        .enqueue(
            request.task.request_type(),
            request.task.payload_value(),
            &user_id,
        )
        .await?;
    info!(job_id = %job.id, request_type = ?job.request_type, "AI request queued");

    Ok(DispatchResponse::Queued {
        job_id: job.id,
        update_token: job.update_token,
        message: "Request queued for processing".to_string(),
    })
}

async fn execute_direct(
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    task: &TaskPayload,
) -> Result<TaskResult, AppError> {
    match task {
        TaskPayload::Suggestions(p) => Ok(TaskResult::Suggestions {
            suggestions: cache_or_compute_suggestions(cache, ai, &p.job_description).await?,
        }),
        TaskPayload::Correction(p) => Ok(TaskResult::Correction {
            corrected_text: cache_or_compute_correction(cache, ai, &p.text).await?,
        }),
        TaskPayload::Optimization(_) => Err(AppError::Unavailable(
            "Resume optimization requires the automation server".to_string(),
        )),
    }
}

/// Cache-or-compute for suggestion tasks: at most one backend call per
/// distinct normalized job description per TTL window.
pub async fn cache_or_compute_suggestions(
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    job_description: &str,
) -> Result<Vec<String>, AppError> {
    let hash = prompt_hash("suggestions", job_description);

    if let Some(entry) = cache.lookup(&hash).await? {
        match serde_json::from_value::<Vec<String>>(entry.response.clone()) {
            Ok(suggestions) => {
                debug!(prompt_hash = %hash, "Suggestions cache hit");
                return Ok(suggestions);
            }
            // Treat an undecodable stored response as a miss and recompute.
            Err(e) => warn!(prompt_hash = %hash, "Discarding undecodable cache entry: {e}"),
        }
    }

    let suggestions = ai
        .generate_suggestions(job_description)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    cache
        .store(&hash, Value::from(suggestions.clone()), ai.model())
        .await?;
    Ok(suggestions)
}

/// Cache-or-compute for correction tasks.
pub async fn cache_or_compute_correction(
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    text: &str,
) -> Result<String, AppError> {
    let hash = prompt_hash("correction", text);

    if let Some(entry) = cache.lookup(&hash).await? {
        match serde_json::from_value::<String>(entry.response.clone()) {
            Ok(corrected) => {
                debug!(prompt_hash = %hash, "Correction cache hit");
                return Ok(corrected);
            }
            Err(e) => warn!(prompt_hash = %hash, "Discarding undecodable cache entry: {e}"),
        }
    }

    let corrected = ai
        .correct_text(text)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    cache
        .store(&hash, Value::from(corrected.clone()), ai.model())
        .await?;
    Ok(corrected)
}

/// Applies an externally reported status change to a job.
///
/// The caller must present the capability token issued at enqueue time, and
/// the transition must move forward: `Pending` is never a valid target and
/// terminal states are immutable. The write itself is conditional on the
/// status observed here, so a concurrent transition surfaces as a conflict
/// instead of a lost update.
pub async fn update_status(
    queue: &dyn QueueStore,
    request: UpdateStatusRequest,
) -> Result<QueueJobRow, AppError> {
    let job = queue.get(request.job_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("No queued request with id {}", request.job_id))
    })?;

    if job.update_token != request.update_token {
        warn!(job_id = %job.id, "Status update with wrong capability token rejected");
        return Err(AppError::Forbidden);
    }

    validate_transition(&job, &request)?;

    let updated = queue
        .set_status_from(
            job.id,
            job.status,
            StatusUpdate {
                status: request.status,
                result: request.result,
                error: request.error,
            },
        )
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Job status changed concurrently; re-read and retry".to_string())
        })?;

    info!(job_id = %updated.id, status = ?updated.status, "Job status updated externally");
    Ok(updated)
}

fn validate_transition(job: &QueueJobRow, request: &UpdateStatusRequest) -> Result<(), AppError> {
    if request.status == JobStatus::Pending {
        return Err(AppError::Validation(
            "A job cannot be moved back to pending".to_string(),
        ));
    }
    if job.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Job {} is already in a terminal state",
            job.id
        )));
    }
    if request.result.is_some() && request.status != JobStatus::Completed {
        return Err(AppError::Validation(
            "A result is only valid with completed status".to_string(),
        ));
    }
    if request.error.is_some() && request.status != JobStatus::Failed {
        return Err(AppError::Validation(
            "An error is only valid with failed status".to_string(),
        ));
    }
    if request.status == JobStatus::Completed {
        let result = request.result.as_ref().ok_or_else(|| {
            AppError::Validation("Completed status requires a result".to_string())
        })?;
        let parsed: TaskResult = serde_json::from_value(result.clone()).map_err(|e| {
            AppError::Validation(format!("Result does not match any known shape: {e}"))
        })?;
        if !parsed.matches(job.request_type) {
            return Err(AppError::Validation(format!(
                "Result shape does not match request type {:?}",
                job.request_type
            )));
        }
    }
    if request.status == JobStatus::Failed && request.error.is_none() {
        return Err(AppError::Validation(
            "Failed status requires an error message".to_string(),
        ));
    }
    Ok(())
}
