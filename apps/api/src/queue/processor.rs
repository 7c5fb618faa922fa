//! Batch execution of pending queue jobs.
//!
//! Runs only when externally triggered; the service never schedules itself.
//! Each run claims up to [`BATCH_SIZE`] of the oldest claimable jobs and
//! executes them sequentially. One job's failure is recorded on that job and
//! never aborts the rest of the batch.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::llm_client::AiBackend;
use crate::models::job::{JobStatus, QueueJobRow, StatusUpdate, TaskPayload, TaskResult};
use crate::queue::dispatch::{cache_or_compute_correction, cache_or_compute_suggestions};
use crate::queue::response_cache::ResponseCache;
use crate::queue::store::QueueStore;

/// Upper bound on jobs taken per run.
pub const BATCH_SIZE: i64 = 5;

/// A claimed job holds `Processing` for this long before a later run may
/// re-claim it.
pub const LEASE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchSummary {
    /// Jobs this run claimed and drove to a terminal state, successes and
    /// failures alike.
    pub processed: usize,
}

/// One externally triggered batch run.
pub async fn run_batch(
    queue: &dyn QueueStore,
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
) -> Result<BatchSummary, AppError> {
    let batch = queue.list_pending(BATCH_SIZE).await?;
    if batch.is_empty() {
        debug!("No pending jobs to process");
        return Ok(BatchSummary { processed: 0 });
    }
    info!(batch_size = batch.len(), "Starting batch run");

    let mut processed = 0;
    for job in batch {
        let lease = Utc::now() + Duration::minutes(LEASE_MINUTES);
        let claimed = match queue.claim(job.id, lease).await? {
            Some(claimed) => claimed,
            None => {
                debug!(job_id = %job.id, "Job claimed elsewhere, skipping");
                continue;
            }
        };
        processed += 1;

        if let Err(e) = process_claimed(queue, cache, ai, &claimed).await {
            warn!(job_id = %claimed.id, "Job failed: {e}");
            let marked = queue
                .set_status_from(
                    claimed.id,
                    JobStatus::Processing,
                    StatusUpdate {
                        status: JobStatus::Failed,
                        result: None,
                        error: Some(e.to_string()),
                    },
                )
                .await;
            match marked {
                Ok(Some(_)) => {}
                Ok(None) => warn!(
                    job_id = %claimed.id,
                    "Job transitioned elsewhere before its failure could be recorded"
                ),
                Err(store_err) => error!(
                    job_id = %claimed.id,
                    "Could not record job failure: {store_err}"
                ),
            }
        }
    }

    info!(processed, "Batch run finished");
    Ok(BatchSummary { processed })
}

/// Executes a claimed job and records completion. A `None` from the
/// conditional completion write means the lease expired and another run took
/// the job over; the result is discarded rather than overwriting theirs.
async fn process_claimed(
    queue: &dyn QueueStore,
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    job: &QueueJobRow,
) -> Result<(), AppError> {
    let result = execute_job(cache, ai, job).await?;

    match queue
        .set_status_from(
            job.id,
            JobStatus::Processing,
            StatusUpdate {
                status: JobStatus::Completed,
                result: Some(result),
                error: None,
            },
        )
        .await?
    {
        Some(_) => {
            info!(job_id = %job.id, request_type = ?job.request_type, "Job completed");
        }
        None => {
            warn!(job_id = %job.id, "Job was re-claimed before completion; dropping result");
        }
    }
    Ok(())
}

async fn execute_job(
    cache: &dyn ResponseCache,
    ai: &dyn AiBackend,
    job: &QueueJobRow,
) -> Result<Value, AppError> {
    let task = TaskPayload::from_parts(job.request_type, job.payload.clone())
        .map_err(|e| AppError::Validation(format!("Stored payload is invalid: {e}")))?;

    let result = match &task {
        TaskPayload::Suggestions(p) => TaskResult::Suggestions {
            suggestions: cache_or_compute_suggestions(cache, ai, &p.job_description).await?,
        },
        TaskPayload::Correction(p) => TaskResult::Correction {
            corrected_text: cache_or_compute_correction(cache, ai, &p.text).await?,
        },
        // Optimization is a stub end to end: the automation pipeline owns
        // the real work, so batch execution just echoes the requested kind.
        TaskPayload::Optimization(p) => TaskResult::Optimization {
            message: "Resume optimization completed".to_string(),
            optimization_kind: p.optimization_kind.clone(),
        },
    };

    Ok(serde_json::to_value(&result).map_err(anyhow::Error::from)?)
}
