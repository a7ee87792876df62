// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every prompt that carries search context.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the SEARCH CONTEXT provided. \
    Cite the source (publication, filing, or call) for each fact. \
    If the context does not cover a point, write \"No public signal found\" \
    instead of guessing.";
