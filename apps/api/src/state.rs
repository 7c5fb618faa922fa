use std::sync::Arc;

use sqlx::PgPool;

use crate::automation::AutomationProbe;
use crate::config::Config;
use crate::llm_client::AiBackend;
use crate::queue::response_cache::ResponseCache;
use crate::queue::store::QueueStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// The queue collaborators are trait objects constructed once in `main`;
/// nothing in the subsystem reaches for a global connection.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Durable job queue. Postgres in production, in-memory in tests.
    pub queue: Arc<dyn QueueStore>,
    /// AI response cache shared by the direct and batch paths.
    pub cache: Arc<dyn ResponseCache>,
    /// AI backend. Production wires the Anthropic client here.
    pub ai: Arc<dyn AiBackend>,
    /// Reachability probe for the external automation server.
    pub probe: Arc<dyn AutomationProbe>,
    pub config: Config,
}
