//! Dragnet search — a fixed batch of topic queries issued sequentially against
//! one provider, flattened into a single context blob for the report prompt.
//!
//! Flow: build_queries → run_dragnet (per-query retry, pacing, URL dedup) →
//!       DragnetResult { context, outcomes }.
//!
//! A failing query never aborts the run. The run fails only if no query
//! produced a single hit.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::search::{normalize_text, SearchError, SearchHit, SearchProvider};
use crate::template::fill_template;

/// Competitor queries beyond this many are ignored.
pub const MAX_COMPETITOR_QUERIES: usize = 3;

const TRUNCATION_MARKER: &str = "\n[context truncated]";

/// (topic, template). `{company}` and `{unit}` are substituted.
const TOPIC_TEMPLATES: &[(&str, &str)] = &[
    ("Annual report", "{company} {unit} 10-K annual report"),
    (
        "Quarterly earnings",
        "{company} {unit} quarterly earnings revenue growth margin",
    ),
    ("Press releases", "{company} {unit} press release"),
    (
        "Strategic investments",
        "{company} {unit} acquisition investment new facility R&D",
    ),
    ("Restructuring", "{company} layoffs restructuring"),
    ("Cash flow", "{company} free cash flow guidance"),
    ("Risk factors", "{company} 10-K risk factors {unit}"),
    ("Leadership", "{company} {unit} executive leadership appointment"),
    ("Hiring", "{company} {unit} hiring jobs"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragnetQuery {
    pub topic: &'static str,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct DragnetSettings {
    pub results_per_query: usize,
    /// Extra attempts per query after the first.
    pub max_retries: u32,
    /// Sleep before retry N is `retry_delay * N`.
    pub retry_delay: Duration,
    /// Sleep between consecutive queries.
    pub pause: Duration,
    pub max_context_chars: usize,
}

/// What happened to one query of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub topic: String,
    pub query: String,
    /// Hits contributed to the context after URL de-duplication.
    pub hits: usize,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DragnetResult {
    pub context: String,
    pub outcomes: Vec<QueryOutcome>,
    pub unique_sources: usize,
}

/// Splits a free-text competitor field ("Thermo Fisher, Waters") into names.
pub fn parse_competitors(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split([',', ';', '\n'])
        .map(|c| normalize_text([c]))
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect()
}

/// Builds the ordered query batch for a company / business unit.
pub fn build_queries(company: &str, unit: &str, competitors: &[String]) -> Vec<DragnetQuery> {
    let mut seen = HashSet::new();
    let mut queries = Vec::new();

    let mut push = |topic: &'static str, query: String| {
        let query = normalize_text([query.as_str()]);
        if !query.is_empty() && seen.insert(query.to_lowercase()) {
            queries.push(DragnetQuery { topic, query });
        }
    };

    for &(topic, template) in TOPIC_TEMPLATES {
        push(
            topic,
            fill_template(template, &[("company", company), ("unit", unit)]),
        );
    }

    for competitor in competitors.iter().take(MAX_COMPETITOR_QUERIES) {
        push("Competitor", format!("{company} {unit} vs {competitor}"));
    }

    queries
}

/// Runs the batch sequentially and assembles the context blob.
pub async fn run_dragnet(
    provider: &dyn SearchProvider,
    queries: &[DragnetQuery],
    settings: &DragnetSettings,
) -> Result<DragnetResult, SearchError> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut outcomes = Vec::with_capacity(queries.len());
    let mut context = String::new();

    for (index, q) in queries.iter().enumerate() {
        if index > 0 && !settings.pause.is_zero() {
            tokio::time::sleep(settings.pause).await;
        }

        let (result, attempts) = search_with_retry(provider, &q.query, settings).await;

        let outcome = match result {
            Ok(hits) => {
                let fresh: Vec<SearchHit> = hits
                    .into_iter()
                    .filter(|h| seen_urls.insert(h.url.clone()))
                    .collect();
                if !fresh.is_empty() {
                    append_section(&mut context, q, &fresh);
                }
                QueryOutcome {
                    topic: q.topic.to_string(),
                    query: q.query.clone(),
                    hits: fresh.len(),
                    attempts,
                    error: None,
                }
            }
            Err(e) => {
                warn!(query = %q.query, attempts, "dragnet: query abandoned: {e}");
                QueryOutcome {
                    topic: q.topic.to_string(),
                    query: q.query.clone(),
                    hits: 0,
                    attempts,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    if seen_urls.is_empty() {
        return Err(SearchError::NoResults {
            queries: queries.len(),
        });
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    info!(
        provider = provider.name(),
        queries = queries.len(),
        failed,
        sources = seen_urls.len(),
        "dragnet: complete"
    );

    Ok(DragnetResult {
        context: truncate_chars(context, settings.max_context_chars),
        outcomes,
        unique_sources: seen_urls.len(),
    })
}

async fn search_with_retry(
    provider: &dyn SearchProvider,
    query: &str,
    settings: &DragnetSettings,
) -> (Result<Vec<SearchHit>, SearchError>, u32) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match provider.search(query, settings.results_per_query).await {
            Ok(hits) => return (Ok(hits), attempt),
            Err(e) if attempt > settings.max_retries => return (Err(e), attempt),
            Err(e) => {
                let delay = settings.retry_delay * attempt;
                warn!(
                    query,
                    attempt,
                    "dragnet: search failed, retrying after {}ms: {e}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn append_section(context: &mut String, q: &DragnetQuery, hits: &[SearchHit]) {
    if !context.is_empty() {
        context.push('\n');
    }
    // Writing into a String cannot fail.
    let _ = writeln!(context, "### {}: {}", q.topic, q.query);
    for hit in hits {
        let _ = writeln!(context, "- {} ({})", hit.title, hit.url);
        if !hit.snippet.is_empty() {
            let _ = writeln!(context, "  {}", hit.snippet);
        }
    }
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
        text.push_str(TRUNCATION_MARKER);
    }
    text
}
