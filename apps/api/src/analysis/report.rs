//! Competitive briefing — orchestrates the full analysis pipeline.
//!
//! Flow: normalize input → build_queries → run_dragnet → fill report template →
//!       complete_with_fallback → AnalysisReport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::prompts::{REPORT_PROMPT_TEMPLATE, REPORT_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::fallback::complete_with_fallback;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::ChatModel;
use crate::search::dragnet::{
    build_queries, parse_competitors, run_dragnet, DragnetSettings, QueryOutcome,
};
use crate::search::SearchProvider;
use crate::template::fill_template;

pub const DEFAULT_COMPETITORS: &str = "Direct Competitors";
pub const DEFAULT_CONTEXT: &str = "None provided";

/// Raw user input for one briefing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisInput {
    pub company: String,
    pub business_unit: String,
    #[serde(default)]
    pub competitors: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// Input after trimming and defaulting. Only built by `AnalysisInput::normalized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub company: String,
    pub business_unit: String,
    /// Parsed competitor names; empty when the user named none.
    pub competitors: Vec<String>,
    /// What the prompt shows under COMPETITORS.
    pub competitors_label: String,
    pub context: String,
}

impl AnalysisInput {
    pub fn normalized(&self) -> Result<NormalizedInput, AppError> {
        let company = self.company.trim();
        let business_unit = self.business_unit.trim();
        if company.is_empty() || business_unit.is_empty() {
            return Err(AppError::Validation(
                "Please enter both a Company and a Business Unit.".to_string(),
            ));
        }

        let competitors = self
            .competitors
            .as_deref()
            .map(parse_competitors)
            .unwrap_or_default();
        let competitors_label = if competitors.is_empty() {
            DEFAULT_COMPETITORS.to_string()
        } else {
            competitors.join(", ")
        };

        let context = self
            .context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTEXT)
            .to_string();

        Ok(NormalizedInput {
            company: company.to_string(),
            business_unit: business_unit.to_string(),
            competitors,
            competitors_label,
            context,
        })
    }
}

/// The finished briefing plus the trail of searches behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub company: String,
    pub business_unit: String,
    pub competitors: String,
    pub markdown: String,
    pub model_used: String,
    pub queries: Vec<QueryOutcome>,
    pub unique_sources: usize,
    pub generated_at: DateTime<Utc>,
}

pub fn build_report_prompt(input: &NormalizedInput, search_context: &str) -> String {
    fill_template(
        REPORT_PROMPT_TEMPLATE,
        &[
            ("grounding_instruction", GROUNDING_INSTRUCTION),
            ("company", input.company.as_str()),
            ("unit", input.business_unit.as_str()),
            ("competitors", input.competitors_label.as_str()),
            ("context", input.context.as_str()),
            ("search_context", search_context),
        ],
    )
}

/// Runs dragnet search plus generation for one company / business unit.
pub async fn run_analysis(
    search: &dyn SearchProvider,
    llm: &dyn ChatModel,
    models: &[String],
    settings: &DragnetSettings,
    input: &AnalysisInput,
    api_key: Option<&str>,
) -> Result<AnalysisReport, AppError> {
    let input = input.normalized()?;

    // Step 1: Dragnet
    let queries = build_queries(&input.company, &input.business_unit, &input.competitors);
    info!(
        company = %input.company,
        unit = %input.business_unit,
        queries = queries.len(),
        "Starting dragnet"
    );
    let dragnet = run_dragnet(search, &queries, settings).await?;

    // Step 2: Generate
    let prompt = build_report_prompt(&input, &dragnet.context);
    let completion = complete_with_fallback(llm, models, REPORT_SYSTEM, &prompt, api_key).await?;

    info!(
        company = %input.company,
        model = %completion.model,
        sources = dragnet.unique_sources,
        "Briefing generated"
    );

    Ok(AnalysisReport {
        company: input.company,
        business_unit: input.business_unit,
        competitors: input.competitors_label,
        markdown: completion.text,
        model_used: completion.model,
        queries: dragnet.outcomes,
        unique_sources: dragnet.unique_sources,
        generated_at: Utc::now(),
    })
}
