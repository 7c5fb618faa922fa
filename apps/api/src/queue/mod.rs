// AI task queue subsystem: dispatch decision, durable job store, response
// cache, and externally triggered batch processing.
// All LLM calls go through llm_client; no direct Anthropic API calls here.

pub mod dispatch;
pub mod handlers;
pub mod processor;
pub mod response_cache;
pub mod store;
