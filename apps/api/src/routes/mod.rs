pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::automation;
use crate::queue::handlers as queue_handlers;
use crate::resume::handlers as resume_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI task queue API
        .route("/api/v1/ai/dispatch", post(queue_handlers::handle_dispatch))
        .route(
            "/api/v1/ai/status",
            get(queue_handlers::handle_job_status).put(queue_handlers::handle_update_status),
        )
        .route("/api/v1/ai/process", post(queue_handlers::handle_run_batch))
        .route(
            "/api/v1/ai/queue/stats",
            get(queue_handlers::handle_queue_stats),
        )
        .route(
            "/api/v1/ai/queue/cleanup",
            post(queue_handlers::handle_queue_cleanup),
        )
        // Automation server health
        .route(
            "/api/v1/automation/health",
            get(automation::automation_health_handler),
        )
        // Resume API
        .route(
            "/api/v1/resumes",
            get(resume_handlers::handle_list_resumes).post(resume_handlers::handle_create_resume),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resume_handlers::handle_get_resume)
                .put(resume_handlers::handle_update_resume)
                .delete(resume_handlers::handle_delete_resume),
        )
        .route(
            "/api/v1/resumes/:id/history",
            get(resume_handlers::handle_optimization_history)
                .post(resume_handlers::handle_log_optimization),
        )
        .with_state(state)
}
