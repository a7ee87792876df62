use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::search::dragnet::DragnetSettings;

pub const DEFAULT_MODELS: &[&str] = &["gpt-4-turbo-preview", "gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"];

/// Which web search backend the dragnet runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchBackend {
    DuckDuckGo,
    Serper,
}

/// Application configuration loaded from environment variables.
/// Every variable has a default; only `SERPER_API_KEY` becomes required
/// when the Serper backend is selected.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    /// Ordered model fallback list. Never empty.
    pub llm_models: Vec<String>,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub search_backend: SearchBackend,
    pub serper_api_key: Option<String>,
    pub search_results_per_query: usize,
    pub search_max_retries: u32,
    pub search_retry_delay_ms: u64,
    pub search_pause_ms: u64,
    pub dragnet_max_context_chars: usize,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            llm_api_key: None,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            llm_temperature: 0.0,
            llm_max_tokens: 4096,
            search_backend: SearchBackend::DuckDuckGo,
            serper_api_key: None,
            search_results_per_query: 5,
            search_max_retries: 2,
            search_retry_delay_ms: 1500,
            search_pause_ms: 500,
            dragnet_max_context_chars: 24_000,
            redis_url: None,
            session_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        let llm_models = match optional_env("LLM_MODELS") {
            Some(raw) => parse_model_list(&raw)?,
            None => defaults.llm_models,
        };

        let search_backend = match optional_env("SEARCH_PROVIDER") {
            Some(raw) => parse_backend(&raw)?,
            None => defaults.search_backend,
        };

        let serper_api_key = optional_env("SERPER_API_KEY");
        if search_backend == SearchBackend::Serper && serper_api_key.is_none() {
            bail!("SERPER_API_KEY must be set when SEARCH_PROVIDER=serper");
        }

        Ok(Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: optional_env("RUST_LOG").unwrap_or(defaults.rust_log),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_base_url: optional_env("LLM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm_base_url),
            llm_models,
            llm_temperature: parse_env("LLM_TEMPERATURE", defaults.llm_temperature)?,
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            search_backend,
            serper_api_key,
            search_results_per_query: parse_env(
                "SEARCH_RESULTS_PER_QUERY",
                defaults.search_results_per_query,
            )?,
            search_max_retries: parse_env("SEARCH_MAX_RETRIES", defaults.search_max_retries)?,
            search_retry_delay_ms: parse_env(
                "SEARCH_RETRY_DELAY_MS",
                defaults.search_retry_delay_ms,
            )?,
            search_pause_ms: parse_env("SEARCH_PAUSE_MS", defaults.search_pause_ms)?,
            dragnet_max_context_chars: parse_env(
                "DRAGNET_MAX_CONTEXT_CHARS",
                defaults.dragnet_max_context_chars,
            )?,
            redis_url: optional_env("REDIS_URL"),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", defaults.session_ttl_secs)?,
        })
    }

    pub fn dragnet_settings(&self) -> DragnetSettings {
        DragnetSettings {
            results_per_query: self.search_results_per_query,
            max_retries: self.search_max_retries,
            retry_delay: Duration::from_millis(self.search_retry_delay_ms),
            pause: Duration::from_millis(self.search_pause_ms),
            max_context_chars: self.dragnet_max_context_chars,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn parse_model_list(raw: &str) -> Result<Vec<String>> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();
    if models.is_empty() {
        bail!("LLM_MODELS must name at least one model");
    }
    Ok(models)
}

fn parse_backend(raw: &str) -> Result<SearchBackend> {
    match raw.to_ascii_lowercase().as_str() {
        "duckduckgo" | "ddg" => Ok(SearchBackend::DuckDuckGo),
        "serper" => Ok(SearchBackend::Serper),
        other => bail!("Unknown SEARCH_PROVIDER '{other}' (expected duckduckgo or serper)"),
    }
}
