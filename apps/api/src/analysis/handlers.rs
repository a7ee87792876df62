//! Axum route handlers for the briefing API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::entity::{resolve_entities, EntityCandidates};
use crate::analysis::report::{run_analysis, AnalysisInput, AnalysisReport};
use crate::errors::AppError;
use crate::session::{Session, SessionStage};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveEntitiesRequest {
    pub company: String,
    #[serde(default)]
    pub business_unit: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveEntitiesResponse {
    pub session_id: Uuid,
    pub stage: SessionStage,
    pub candidates: EntityCandidates,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeSessionRequest {
    /// Chosen legal entity; defaults to the company typed in step 1.
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub business_unit: Option<String>,
    #[serde(default)]
    pub competitors: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DirectAnalysisRequest {
    #[serde(flatten)]
    pub input: AnalysisInput,
    #[serde(default)]
    pub api_key: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/entities
///
/// Step 1: resolves the company name into candidate entities and business
/// units, and opens a session for step 2.
pub async fn handle_resolve_entities(
    State(state): State<AppState>,
    Json(request): Json<ResolveEntitiesRequest>,
) -> Result<Json<ResolveEntitiesResponse>, AppError> {
    let api_key = resolve_api_key(&state, request.api_key.as_deref())?;
    let company = request.company.trim();
    if company.is_empty() {
        return Err(AppError::Validation("Please enter a Company.".to_string()));
    }

    let unit_hint = non_blank(request.business_unit.as_deref());
    let candidates = resolve_entities(
        state.search.as_ref(),
        state.llm.as_ref(),
        &state.config.llm_models,
        company,
        unit_hint,
        state.config.search_results_per_query,
        api_key,
    )
    .await?;

    let session = Session::new(company.to_string(), unit_hint.map(String::from), candidates);
    state.sessions.put(&session).await?;
    info!(session_id = %session.id, company, "Session opened");

    Ok(Json(ResolveEntitiesResponse {
        session_id: session.id,
        stage: session.stage,
        candidates: session.candidates,
    }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = load_session(&state, session_id).await?;
    Ok(Json(session))
}

/// POST /api/v1/sessions/:id/analyze
///
/// Step 2: runs the briefing for the chosen entity / unit and stores the
/// report on the session. Re-running replaces the previous report.
pub async fn handle_analyze_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnalyzeSessionRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    let api_key = resolve_api_key(&state, request.api_key.as_deref())?;
    let mut session = load_session(&state, session_id).await?;

    let company = non_blank(request.entity.as_deref())
        .unwrap_or(session.company.as_str())
        .to_string();
    if !session.is_known_entity(&company) {
        info!(session_id = %session_id, entity = %company, "Analyzing entity outside the resolved candidates");
    }

    let business_unit = non_blank(request.business_unit.as_deref())
        .or(session.business_unit.as_deref())
        .unwrap_or_default()
        .to_string();

    let input = AnalysisInput {
        company,
        business_unit,
        competitors: request.competitors,
        context: request.context,
    };

    let report = run_analysis(
        state.search.as_ref(),
        state.llm.as_ref(),
        &state.config.llm_models,
        &state.config.dragnet_settings(),
        &input,
        api_key,
    )
    .await?;

    session.record_report(report.clone());
    state.sessions.put(&session).await?;

    Ok(Json(report))
}

/// POST /api/v1/analysis
///
/// Single-step variant: company and unit are given directly, no session.
pub async fn handle_direct_analysis(
    State(state): State<AppState>,
    Json(request): Json<DirectAnalysisRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    let api_key = resolve_api_key(&state, request.api_key.as_deref())?;

    let report = run_analysis(
        state.search.as_ref(),
        state.llm.as_ref(),
        &state.config.llm_models,
        &state.config.dragnet_settings(),
        &request.input,
        api_key,
    )
    .await?;

    Ok(Json(report))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Picks the request's key if given. `None` means "use the server key".
/// Fails when neither exists so no search is wasted on a doomed request.
fn resolve_api_key<'a>(
    state: &AppState,
    request_key: Option<&'a str>,
) -> Result<Option<&'a str>, AppError> {
    match non_blank(request_key) {
        Some(key) => Ok(Some(key)),
        None if state.config.llm_api_key.is_some() => Ok(None),
        None => Err(AppError::Validation(
            "Please enter your LLM API key to proceed.".to_string(),
        )),
    }
}

async fn load_session(state: &AppState, session_id: Uuid) -> Result<Session, AppError> {
    state
        .sessions
        .get(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found or expired")))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
