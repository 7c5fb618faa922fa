//! In-memory doubles for the queue store, response cache, AI backend, and
//! automation probe. They mirror the observable semantics of the Postgres
//! implementations so the subsystem tests run without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::automation::AutomationProbe;
use crate::errors::AppError;
use crate::llm_client::{AiBackend, LlmError};
use crate::models::cache::CacheEntryRow;
use crate::models::job::{JobStatus, QueueJobRow, QueueStats, RequestType, StatusUpdate};
use crate::queue::response_cache::{ResponseCache, CACHE_TTL_HOURS};
use crate::queue::store::{QueueStore, RETENTION_DAYS};

// ────────────────────────────────────────────────────────────────────────────
// Queue store
// ────────────────────────────────────────────────────────────────────────────

/// Claimability matches the store SQL: a `Processing` job with no lease is
/// not claimable.
fn is_claimable(job: &QueueJobRow, now: DateTime<Utc>) -> bool {
    match job.status {
        JobStatus::Pending => true,
        JobStatus::Processing => job.lease_expires_at.map_or(false, |lease| lease < now),
        _ => false,
    }
}

#[derive(Default)]
pub struct MemoryQueueStore {
    jobs: Mutex<Vec<QueueJobRow>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a pending correction job with a chosen `created_at`, which the
    /// real store always stamps itself.
    pub fn seed_pending(&self, payload: Value, created_at: DateTime<Utc>) -> Uuid {
        self.push(
            RequestType::Correction,
            payload,
            JobStatus::Pending,
            None,
            created_at,
            None,
        )
    }

    pub fn seed_pending_suggestions(
        &self,
        job_description: &str,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        self.push(
            RequestType::Suggestions,
            json!({ "job_description": job_description }),
            JobStatus::Pending,
            None,
            created_at,
            None,
        )
    }

    pub fn seed_processing(
        &self,
        payload: Value,
        lease_expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        self.push(
            RequestType::Correction,
            payload,
            JobStatus::Processing,
            Some(lease_expires_at),
            created_at,
            None,
        )
    }

    pub fn seed_terminal(&self, status: JobStatus, payload: Value, created_at: DateTime<Utc>) -> Uuid {
        self.push(
            RequestType::Correction,
            payload,
            status,
            None,
            created_at,
            Some(created_at),
        )
    }

    fn push(
        &self,
        request_type: RequestType,
        payload: Value,
        status: JobStatus,
        lease_expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.lock().unwrap().push(QueueJobRow {
            id,
            user_id: "anonymous".to_string(),
            request_type,
            payload,
            status,
            result: None,
            error: None,
            update_token: Uuid::new_v4(),
            lease_expires_at,
            created_at,
            processed_at,
        });
        id
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        request_type: RequestType,
        payload: Value,
        user_id: &str,
    ) -> Result<QueueJobRow, AppError> {
        let job = QueueJobRow {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            request_type,
            payload,
            status: JobStatus::Pending,
            result: None,
            error: None,
            update_token: Uuid::new_v4(),
            lease_expires_at: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<QueueJobRow>, AppError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<QueueJobRow>, AppError> {
        let now = Utc::now();
        let mut claimable: Vec<QueueJobRow> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| is_claimable(j, now))
            .cloned()
            .collect();
        claimable.sort_by_key(|j| j.created_at);
        claimable.truncate(limit.max(0) as usize);
        Ok(claimable)
    }

    async fn claim(
        &self,
        job_id: Uuid,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<Option<QueueJobRow>, AppError> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == job_id && is_claimable(j, now))
        else {
            return Ok(None);
        };
        job.status = JobStatus::Processing;
        job.lease_expires_at = Some(lease_expires_at);
        Ok(Some(job.clone()))
    }

    async fn set_status_from(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<Option<QueueJobRow>, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == expected)
        else {
            return Ok(None);
        };
        job.status = update.status;
        job.result = update.result;
        job.error = update.error;
        if update.status.is_terminal() {
            job.processed_at = Some(Utc::now());
            job.lease_expires_at = None;
        }
        Ok(Some(job.clone()))
    }

    async fn stats(&self) -> Result<QueueStats, AppError> {
        let jobs = self.jobs.lock().unwrap();
        let today = Utc::now().date_naive();
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count() as i64;
        Ok(QueueStats {
            total: jobs.len() as i64,
            pending: count(JobStatus::Pending),
            processing: count(JobStatus::Processing),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            today: jobs
                .iter()
                .filter(|j| j.created_at.date_naive() == today)
                .count() as i64,
        })
    }

    async fn cleanup(&self) -> Result<Vec<QueueJobRow>, AppError> {
        let cutoff = Utc::now() - Duration::days(i64::from(RETENTION_DAYS));
        let mut jobs = self.jobs.lock().unwrap();
        let (removed, kept): (Vec<QueueJobRow>, Vec<QueueJobRow>) = jobs
            .drain(..)
            .partition(|j| j.status.is_terminal() && j.created_at < cutoff);
        *jobs = kept;
        Ok(removed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response cache
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryResponseCache {
    entries: Mutex<HashMap<String, CacheEntryRow>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry verbatim, timestamps included, for expiry tests.
    pub fn insert_raw(&self, entry: CacheEntryRow) {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.prompt_hash.clone(), entry);
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn lookup(&self, prompt_hash: &str) -> Result<Option<CacheEntryRow>, AppError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(prompt_hash)
            .filter(|e| e.expires_at > Utc::now())
            .cloned())
    }

    async fn store(
        &self,
        prompt_hash: &str,
        response: Value,
        model: &str,
    ) -> Result<CacheEntryRow, AppError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        // Upsert keeps the original created_at, like the SQL ON CONFLICT arm.
        let created_at = entries
            .get(prompt_hash)
            .map(|e| e.created_at)
            .unwrap_or(now);
        let entry = CacheEntryRow {
            prompt_hash: prompt_hash.to_string(),
            response,
            model: model.to_string(),
            created_at,
            expires_at: now + Duration::hours(i64::from(CACHE_TTL_HOURS)),
        };
        entries.insert(prompt_hash.to_string(), entry.clone());
        Ok(entry)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AI backend
// ────────────────────────────────────────────────────────────────────────────

/// Scripted backend that counts calls. With `failing_on`, any input
/// containing the marker fails; everything else succeeds.
pub struct MockBackend {
    calls: AtomicUsize,
    fail_marker: Option<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_marker: None,
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn scripted_suggestions(&self) -> Vec<String> {
        vec![
            "Led a cross-functional team of 8 engineers".to_string(),
            "Reduced deployment time by 40%".to_string(),
            "Designed the zero-downtime migration path".to_string(),
        ]
    }

    pub fn scripted_correction(&self) -> String {
        "The corrected text reads cleanly.".to_string()
    }

    fn record(&self, input: &str) -> Result<(), LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_marker {
            Some(marker) if input.contains(marker.as_str()) => Err(LlmError::Api {
                status: 500,
                message: "mock backend failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn generate_suggestions(&self, job_description: &str) -> Result<Vec<String>, LlmError> {
        self.record(job_description)?;
        Ok(self.scripted_suggestions())
    }

    async fn correct_text(&self, text: &str) -> Result<String, LlmError> {
        self.record(text)?;
        Ok(self.scripted_correction())
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Automation probe
// ────────────────────────────────────────────────────────────────────────────

/// Probe with a fixed answer.
pub struct StaticProbe(pub bool);

#[async_trait]
impl AutomationProbe for StaticProbe {
    async fn is_available(&self) -> bool {
        self.0
    }
}
