//! Web search — provider trait plus the DuckDuckGo and Serper backends.
//!
//! Providers return plain `SearchHit`s; retry, pacing and aggregation live in
//! `dragnet`, so a provider makes exactly one upstream request per call.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, SearchBackend};

pub mod dragnet;
pub mod duckduckgo;
pub mod serper;
#[cfg(test)]
pub mod testing;

pub use duckduckgo::DuckDuckGoSearch;
pub use serper::SerperSearch;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned status {0}")]
    Status(u16),

    #[error("Search provider is throttling requests")]
    Throttled,

    #[error("Failed to parse search response: {0}")]
    Parse(String),

    #[error("No search results for any of {queries} queries")]
    NoResults { queries: usize },
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short backend name, used in logs.
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Builds the configured backend.
pub fn build_provider(config: &Config) -> Result<Arc<dyn SearchProvider>> {
    match config.search_backend {
        SearchBackend::DuckDuckGo => Ok(Arc::new(
            DuckDuckGoSearch::new().context("Failed to build DuckDuckGo client")?,
        )),
        SearchBackend::Serper => {
            let key = config
                .serper_api_key
                .as_deref()
                .context("SERPER_API_KEY is required for the serper backend")?;
            Ok(Arc::new(
                SerperSearch::new(key).context("Failed to build Serper client")?,
            ))
        }
    }
}

/// Collapses runs of whitespace in scraped or API-provided text.
pub(crate) fn normalize_text<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(
            normalize_text(["  Agilent \n Technologies", "\tQ3  results "]),
            "Agilent Technologies Q3 results"
        );
    }

    #[test]
    fn test_build_provider_defaults_to_duckduckgo() {
        let provider = build_provider(&Config::default()).unwrap();
        assert_eq!(provider.name(), "duckduckgo");
    }

    #[test]
    fn test_build_provider_serper_requires_key() {
        let config = Config {
            search_backend: SearchBackend::Serper,
            ..Config::default()
        };
        assert!(build_provider(&config).is_err());

        let config = Config {
            search_backend: SearchBackend::Serper,
            serper_api_key: Some("key".to_string()),
            ..Config::default()
        };
        assert_eq!(build_provider(&config).unwrap().name(), "serper");
    }
}
