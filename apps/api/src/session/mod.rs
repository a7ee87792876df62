//! Session state for the two-step flow.
//!
//! Step 1 (entity disambiguation) creates a `Session` holding the candidates.
//! Step 2 (analysis) reads it back, runs the briefing and stores the report.
//! Sessions expire after the configured TTL in either backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::entity::EntityCandidates;
use crate::analysis::report::AnalysisReport;

pub mod memory;
pub mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    EntitiesResolved,
    Analyzed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Company name as the user typed it.
    pub company: String,
    /// Optional unit hint given in step 1.
    pub business_unit: Option<String>,
    pub candidates: EntityCandidates,
    pub stage: SessionStage,
    pub report: Option<AnalysisReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(company: String, business_unit: Option<String>, candidates: EntityCandidates) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company,
            business_unit,
            candidates,
            stage: SessionStage::EntitiesResolved,
            report: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the session to `Analyzed`, replacing any earlier report.
    pub fn record_report(&mut self, report: AnalysisReport) {
        self.report = Some(report);
        self.stage = SessionStage::Analyzed;
        self.updated_at = Utc::now();
    }

    /// Whether `name` matches one of the resolved entities (case-insensitive).
    pub fn is_known_entity(&self, name: &str) -> bool {
        self.candidates
            .entities
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError>;

    /// Inserts or replaces; resets the TTL.
    async fn put(&self, session: &Session) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::analysis::entity::EntityCandidate;

    fn candidates() -> EntityCandidates {
        EntityCandidates {
            entities: vec![EntityCandidate {
                name: "Agilent Technologies, Inc.".to_string(),
                description: String::new(),
            }],
            business_units: vec!["Agilent CrossLab".to_string()],
        }
    }

    fn report() -> AnalysisReport {
        AnalysisReport {
            company: "Agilent Technologies, Inc.".to_string(),
            business_unit: "Agilent CrossLab".to_string(),
            competitors: "Direct Competitors".to_string(),
            markdown: "# Briefing".to_string(),
            model_used: "gpt-4o".to_string(),
            queries: vec![],
            unique_sources: 3,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_session_starts_at_entities_resolved() {
        let session = Session::new("Agilent".to_string(), None, candidates());
        assert_eq!(session.stage, SessionStage::EntitiesResolved);
        assert!(session.report.is_none());
    }

    #[test]
    fn test_record_report_advances_stage() {
        let mut session = Session::new("Agilent".to_string(), None, candidates());
        session.record_report(report());
        assert_eq!(session.stage, SessionStage::Analyzed);
        assert_eq!(session.report.as_ref().unwrap().model_used, "gpt-4o");
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn test_is_known_entity_ignores_case_and_padding() {
        let session = Session::new("Agilent".to_string(), None, candidates());
        assert!(session.is_known_entity(" agilent technologies, inc. "));
        assert!(!session.is_known_entity("Agilent Labs"));
    }

    #[test]
    fn test_session_stage_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStage::EntitiesResolved).unwrap();
        assert_eq!(json, "\"entities_resolved\"");
    }

    #[test]
    fn test_session_json_roundtrip_keeps_report() {
        let mut session = Session::new("Agilent".to_string(), Some("CrossLab".to_string()), candidates());
        session.record_report(report());

        let json = serde_json::to_string(&session).unwrap();
        let recovered: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(recovered.id, session.id);
        assert_eq!(recovered.stage, SessionStage::Analyzed);
        assert_eq!(recovered.candidates, session.candidates);
        assert_eq!(recovered.report.unwrap().unique_sources, 3);
    }
}
