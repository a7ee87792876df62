mod analysis;
mod config;
mod errors;
mod llm_client;
mod routes;
mod search;
mod session;
mod state;
mod template;
#[cfg(test)]
mod test_server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{ChatModel, LlmClient};
use crate::routes::build_router;
use crate::search::build_provider;
use crate::session::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Analyst API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize search backend
    let search = build_provider(&config)?;
    info!("Search provider initialized ({})", search.name());

    // Initialize LLM client
    let llm: Arc<dyn ChatModel> = Arc::new(LlmClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_temperature,
        config.llm_max_tokens,
    )?);
    info!(
        "LLM client initialized (models: {}; server key: {})",
        config.llm_models.join(" -> "),
        if config.llm_api_key.is_some() { "set" } else { "per-request only" }
    );

    // Initialize session store
    let ttl = Duration::from_secs(config.session_ttl_secs);
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let store = RedisSessionStore::connect(client, ttl).await?;
            info!("Redis session store initialized");
            Arc::new(store)
        }
        None => {
            info!("In-memory session store initialized");
            Arc::new(InMemorySessionStore::new(ttl))
        }
    };

    // Build app state
    let state = AppState {
        search,
        llm,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
