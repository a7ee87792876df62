// Two-step briefing flow: entity disambiguation, then dragnet + generation.
// All LLM calls go through llm_client::fallback; all searches through a SearchProvider.

pub mod entity;
pub mod handlers;
pub mod prompts;
pub mod report;
