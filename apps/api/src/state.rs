use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatModel;
use crate::search::SearchProvider;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Configured web search backend (DuckDuckGo or Serper).
    pub search: Arc<dyn SearchProvider>,
    /// Chat-completions client. Callers go through `complete_with_fallback`
    /// with `config.llm_models`.
    pub llm: Arc<dyn ChatModel>,
    /// Redis when `REDIS_URL` is set, otherwise in-process.
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
}
