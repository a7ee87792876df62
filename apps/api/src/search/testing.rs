//! Canned `SearchProvider` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::search::{SearchError, SearchHit, SearchProvider};

/// Returns fixed hits per query. Unknown queries return no hits.
/// `failures` makes a query throttle that many times before answering.
#[derive(Default)]
pub struct CannedSearch {
    hits: HashMap<String, Vec<SearchHit>>,
    failures: Mutex<HashMap<String, u32>>,
    always_fail: bool,
    calls: Mutex<Vec<String>>,
}

impl CannedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn with_hits(mut self, query: &str, urls: &[&str]) -> Self {
        let hits = urls
            .iter()
            .map(|url| SearchHit {
                title: format!("Title for {url}"),
                url: url.to_string(),
                snippet: format!("Snippet about {query}"),
            })
            .collect();
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub fn flaky(self, query: &str, failures: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(query.to_string(), failures);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for CannedSearch {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());

        if self.always_fail {
            return Err(SearchError::Status(503));
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(query) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SearchError::Throttled);
                }
            }
        }

        Ok(self
            .hits
            .get(query)
            .map(|hits| hits.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }
}
