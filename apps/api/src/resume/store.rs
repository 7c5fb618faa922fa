//! Resume document persistence and optimization history.

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{OptimizationHistoryRow, ResumeRow};

/// Template applied when a resume is created. The UI offers Modern,
/// Classic, Minimalist, and Creative; the column stores free text since
/// visual design lives entirely client-side.
pub const DEFAULT_TEMPLATE: &str = "Modern";

/// History queries return this many entries unless the caller asks
/// otherwise.
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Starting document for a new resume.
pub fn default_content() -> Value {
    json!({
        "personalInfo": {
            "name": "",
            "email": "",
            "phone": "",
            "linkedin": ""
        },
        "experience": [],
        "education": [],
        "skills": [],
        "certifications": [],
        "summary": ""
    })
}

pub async fn list_resumes(
    pool: &PgPool,
    session_id: Option<&str>,
) -> Result<Vec<ResumeRow>, AppError> {
    let rows = match session_id {
        Some(session) => {
            sqlx::query_as::<_, ResumeRow>(
                "SELECT * FROM resumes WHERE session_id = $1 ORDER BY updated_at DESC",
            )
            .bind(session)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes ORDER BY updated_at DESC")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn get_resume(pool: &PgPool, resume_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
    Ok(
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(resume_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn create_resume(
    pool: &PgPool,
    name: &str,
    session_id: Option<&str>,
) -> Result<ResumeRow, AppError> {
    Ok(sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (id, name, content, template, session_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(default_content())
    .bind(DEFAULT_TEMPLATE)
    .bind(session_id)
    .fetch_one(pool)
    .await?)
}

/// Partial update; absent fields keep their current value.
pub struct ResumeChanges {
    pub name: Option<String>,
    pub content: Option<Value>,
    pub template: Option<String>,
}

pub async fn update_resume(
    pool: &PgPool,
    resume_id: Uuid,
    changes: ResumeChanges,
) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes
        SET name = COALESCE($2, name),
            content = COALESCE($3, content),
            template = COALESCE($4, template),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(changes.name)
    .bind(changes.content)
    .bind(changes.template)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

pub async fn delete_resume(pool: &PgPool, resume_id: Uuid) -> Result<(), AppError> {
    let outcome = sqlx::query("DELETE FROM resumes WHERE id = $1")
        .bind(resume_id)
        .execute(pool)
        .await?;

    if outcome.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    Ok(())
}

/// Records one applied optimization on a resume.
pub async fn log_optimization(
    pool: &PgPool,
    resume_id: Uuid,
    optimization_kind: &str,
    before_content: Value,
    after_content: Value,
    ai_suggestions: Value,
) -> Result<OptimizationHistoryRow, AppError> {
    Ok(sqlx::query_as::<_, OptimizationHistoryRow>(
        r#"
        INSERT INTO resume_optimization_history
            (id, resume_id, optimization_kind, before_content, after_content, ai_suggestions)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(optimization_kind)
    .bind(before_content)
    .bind(after_content)
    .bind(ai_suggestions)
    .fetch_one(pool)
    .await?)
}

pub async fn optimization_history(
    pool: &PgPool,
    resume_id: Uuid,
    limit: i64,
) -> Result<Vec<OptimizationHistoryRow>, AppError> {
    Ok(sqlx::query_as::<_, OptimizationHistoryRow>(
        r#"
        SELECT *
        FROM resume_optimization_history
        WHERE resume_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(resume_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}
