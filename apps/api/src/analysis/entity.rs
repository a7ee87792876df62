//! Entity disambiguation — resolves a typed company name into candidate legal
//! entities and business units with one search and one model call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::prompts::{ENTITY_PROMPT_TEMPLATE, ENTITY_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::fallback::complete_with_fallback;
use crate::llm_client::{parse_json_reply, ChatModel};
use crate::search::{SearchHit, SearchProvider};
use crate::template::fill_template;

pub const MAX_ENTITIES: usize = 5;
pub const MAX_BUSINESS_UNITS: usize = 8;

const NO_SEARCH_RESULTS: &str = "No search results";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCandidates {
    #[serde(default)]
    pub entities: Vec<EntityCandidate>,
    #[serde(default)]
    pub business_units: Vec<String>,
}

impl EntityCandidates {
    /// Trims names, drops blanks and case-insensitive duplicates, caps list sizes.
    pub fn sanitized(self) -> Self {
        let mut seen = HashSet::new();
        let entities = self
            .entities
            .into_iter()
            .map(|e| EntityCandidate {
                name: e.name.trim().to_string(),
                description: e.description.trim().to_string(),
            })
            .filter(|e| !e.name.is_empty() && seen.insert(e.name.to_lowercase()))
            .take(MAX_ENTITIES)
            .collect();

        let mut seen = HashSet::new();
        let business_units = self
            .business_units
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty() && seen.insert(u.to_lowercase()))
            .take(MAX_BUSINESS_UNITS)
            .collect();

        EntityCandidates {
            entities,
            business_units,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.business_units.is_empty()
    }
}

pub fn entity_query(company: &str) -> String {
    format!("{company} legal entity subsidiaries business units")
}

/// Runs the disambiguation step for `company`.
///
/// A failed search is tolerated; the model then answers from its own knowledge.
/// An unparseable model reply is an `AppError::Llm`.
pub async fn resolve_entities(
    search: &dyn SearchProvider,
    llm: &dyn ChatModel,
    models: &[String],
    company: &str,
    unit_hint: Option<&str>,
    max_results: usize,
    api_key: Option<&str>,
) -> Result<EntityCandidates, AppError> {
    let query = entity_query(company);
    let search_context = match search.search(&query, max_results).await {
        Ok(hits) if !hits.is_empty() => format_hits(&hits),
        Ok(_) => NO_SEARCH_RESULTS.to_string(),
        Err(e) => {
            warn!(company, "Entity search failed, continuing without context: {e}");
            NO_SEARCH_RESULTS.to_string()
        }
    };

    let prompt = build_entity_prompt(company, unit_hint, &search_context);
    let completion = complete_with_fallback(llm, models, ENTITY_SYSTEM, &prompt, api_key).await?;

    let candidates: EntityCandidates = parse_json_reply(&completion.text)
        .map_err(|e| AppError::Llm(format!("Entity resolution reply was not valid JSON: {e}")))?;
    let candidates = candidates.sanitized();
    if candidates.is_empty() {
        warn!(company, model = %completion.model, "Model returned no entity candidates");
    }

    info!(
        company,
        model = %completion.model,
        entities = candidates.entities.len(),
        units = candidates.business_units.len(),
        "Entities resolved"
    );

    Ok(candidates)
}

fn build_entity_prompt(company: &str, unit_hint: Option<&str>, search_context: &str) -> String {
    let unit_hint = unit_hint
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("none");

    fill_template(
        ENTITY_PROMPT_TEMPLATE,
        &[
            ("company", company),
            ("unit_hint", unit_hint),
            ("search_context", search_context),
        ],
    )
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("- {} ({})\n  {}", h.title, h.url, h.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
