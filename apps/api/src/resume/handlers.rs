//! Axum route handlers for resume documents and their optimization history.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{OptimizationHistoryRow, ResumeRow};
use crate::resume::store;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListResumesQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub name: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResumeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogOptimizationRequest {
    pub optimization_kind: String,
    pub before_content: Value,
    pub after_content: Value,
    #[serde(default)]
    pub ai_suggestions: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes?session_id=...
///
/// Lists resumes newest-updated first, optionally scoped to one session.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(query): Query<ListResumesQuery>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let resumes = store::list_resumes(&state.db, query.session_id.as_deref()).await?;
    Ok(Json(resumes))
}

/// POST /api/v1/resumes
///
/// Creates a resume with the default document and template.
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(request): Json<CreateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let resume =
        store::create_resume(&state.db, request.name.trim(), request.session_id.as_deref())
            .await?;
    Ok(Json(resume))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = store::get_resume(&state.db, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(Json(resume))
}

/// PUT /api/v1/resumes/:id
///
/// Partial update of name, content, or template.
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(request): Json<UpdateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    if request.name.is_none() && request.content.is_none() && request.template.is_none() {
        return Err(AppError::Validation(
            "At least one of name, content, template is required".to_string(),
        ));
    }
    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
    }

    let resume = store::update_resume(
        &state.db,
        resume_id,
        store::ResumeChanges {
            name: request.name,
            content: request.content,
            template: request.template,
        },
    )
    .await?;
    Ok(Json(resume))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::delete_resume(&state.db, resume_id).await?;
    Ok(Json(json!({"deleted": true})))
}

/// POST /api/v1/resumes/:id/history
///
/// Records an optimization the client applied to a resume.
pub async fn handle_log_optimization(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(request): Json<LogOptimizationRequest>,
) -> Result<Json<OptimizationHistoryRow>, AppError> {
    if request.optimization_kind.trim().is_empty() {
        return Err(AppError::Validation(
            "optimization_kind cannot be empty".to_string(),
        ));
    }

    store::get_resume(&state.db, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let entry = store::log_optimization(
        &state.db,
        resume_id,
        request.optimization_kind.trim(),
        request.before_content,
        request.after_content,
        request.ai_suggestions.unwrap_or_else(|| json!([])),
    )
    .await?;
    Ok(Json(entry))
}

/// GET /api/v1/resumes/:id/history?limit=...
pub async fn handle_optimization_history(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<OptimizationHistoryRow>>, AppError> {
    let limit = query.limit.unwrap_or(store::DEFAULT_HISTORY_LIMIT);
    if limit < 1 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }

    store::get_resume(&state.db, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let history = store::optimization_history(&state.db, resume_id, limit).await?;
    Ok(Json(history))
}
