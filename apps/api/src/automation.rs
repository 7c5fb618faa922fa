//! Availability probe for the external automation server.
//!
//! The dispatcher asks before every routing decision; a reachable server
//! means the task is queued for the automation pipeline, an unreachable one
//! means inline fallback execution. Probe results are never cached, so
//! staleness is bounded by call frequency.

use async_trait::async_trait;
use axum::extract::State;
use axum::Json;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::state::AppState;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[async_trait]
pub trait AutomationProbe: Send + Sync {
    /// One health round-trip. `true` only on an explicit success status;
    /// timeouts and transport errors are reported as unavailable, never as
    /// errors.
    async fn is_available(&self) -> bool;
}

/// Probes `{base_url}/healthz` with a short timeout.
pub struct HttpAutomationProbe {
    client: Client,
    health_url: String,
}

impl HttpAutomationProbe {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            health_url: format!("{}/healthz", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl AutomationProbe for HttpAutomationProbe {
    async fn is_available(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(
                    "Automation server health returned {}, treating as unavailable",
                    response.status()
                );
                false
            }
            Err(e) => {
                debug!("Automation server unreachable: {e}");
                false
            }
        }
    }
}

/// GET /api/v1/automation/health
/// Surfaces one probe result so clients can hint whether AI requests will
/// queue or run inline.
pub async fn automation_health_handler(State(state): State<AppState>) -> Json<Value> {
    let available = state.probe.is_available().await;
    let message = if available {
        "Automation server is reachable; AI requests will be queued"
    } else {
        "Automation server is unreachable; AI requests run inline"
    };

    Json(json!({
        "available": available,
        "message": message
    }))
}
