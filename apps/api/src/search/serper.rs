// Google results through the Serper API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::search::{normalize_text, SearchError, SearchHit, SearchProvider, REQUEST_TIMEOUT_SECS};

const ENDPOINT: &str = "https://google.serper.dev/search";

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

pub struct SerperSearch {
    api_key: String,
    client: Client,
}

impl SerperSearch {
    pub fn new(api_key: &str) -> Result<Self, SearchError> {
        Ok(Self {
            api_key: api_key.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
        })
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        info!(query, max_results, "search: querying serper");

        let response = self
            .client
            .post(ENDPOINT)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({
                "q": query,
                "num": max_results,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::Throttled);
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let hits = parse_response(&body, max_results)?;

        info!(query, count = hits.len(), "search: complete");
        Ok(hits)
    }
}

fn parse_response(body: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let data: SerperResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

    Ok(data
        .organic
        .into_iter()
        .filter(|r| !r.link.is_empty())
        .map(|r| SearchHit {
            title: normalize_text([r.title.as_str()]),
            url: r.link,
            snippet: normalize_text([r.snippet.as_str()]),
        })
        .take(max_results)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_maps_organic_results() {
        let body = r#"{
            "searchParameters": {"q": "Agilent layoffs"},
            "organic": [
                {"title": "Agilent to cut  jobs", "link": "https://news.example/agilent", "snippet": "Restructuring\nplan", "position": 1},
                {"title": "No link", "snippet": "dropped"},
                {"title": "Second", "link": "https://news.example/2"}
            ]
        }"#;
        let hits = parse_response(body, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Agilent to cut jobs");
        assert_eq!(hits[0].snippet, "Restructuring plan");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_response_without_organic_is_empty() {
        let hits = parse_response(r#"{"answerBox": {}}"#, 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            parse_response("<html>", 5),
            Err(SearchError::Parse(_))
        ));
    }
}
