use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::interview::orchestrator::SessionStore;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable text-generation capability. Production wires the Anthropic
    /// client; tests inject a scripted fake.
    pub llm: Arc<dyn TextGenerator>,
    /// Process-local working state for in-progress interviews, keyed by
    /// session token. The DB row is the durable record.
    pub sessions: SessionStore,
    /// Runtime settings kept alongside the handlers that will need them.
    #[allow(dead_code)]
    pub config: Config,
}
