use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::search::{normalize_text, SearchError, SearchHit, SearchProvider, REQUEST_TIMEOUT_SECS};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Keyless search through DuckDuckGo's HTML endpoint.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_endpoint(ENDPOINT)
    }

    fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        info!(query, max_results, "search: querying duckduckgo");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .form(&[("q", query), ("b", ""), ("kl", "wt-wt")])
            .send()
            .await?;

        let status = response.status();
        // 202 is DuckDuckGo's soft rate limit: an empty page, not an error status.
        if status == StatusCode::ACCEPTED {
            return Err(SearchError::Throttled);
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        debug!("Parsing DuckDuckGo HTML ({} bytes)", html.len());
        let hits = parse_results(&html, max_results)?;

        info!(query, count = hits.len(), "search: complete");
        Ok(hits)
    }
}

/// Extracts result links and snippets from a DuckDuckGo HTML results page.
pub(crate) fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let document = Html::parse_document(html);
    let result_selector = selector("div.result")?;
    let link_selector = selector("a.result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let hits = document
        .select(&result_selector)
        .filter_map(|result| {
            let link = result.select(&link_selector).next()?;
            let url = decode_redirect(link.value().attr("href")?)?;
            let title = normalize_text(link.text());
            if title.is_empty() {
                return None;
            }
            let snippet = result
                .select(&snippet_selector)
                .next()
                .map(|s| normalize_text(s.text()))
                .unwrap_or_default();
            Some(SearchHit {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect();

    Ok(hits)
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("selector '{css}': {e}")))
}

/// Resolves `//duckduckgo.com/l/?uddg=<encoded>` redirect links to the target URL.
/// Ad links (`/y.js`) and anything unparseable are dropped.
fn decode_redirect(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let url = base.join(href).ok()?;

    if url.domain() == Some("duckduckgo.com") {
        if url.path() == "/l/" {
            return url
                .query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned());
        }
        return None;
    }

    Some(url.to_string())
}
