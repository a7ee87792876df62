// All LLM prompt constants for the analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for entity disambiguation — enforces JSON-only output.
pub const ENTITY_SYSTEM: &str = "You are a corporate research assistant who maps \
    company names to their legal entities and reporting segments. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Entity disambiguation prompt. Replace `{company}`, `{unit_hint}`, `{search_context}`.
pub const ENTITY_PROMPT_TEMPLATE: &str = r#"A user typed the company name "{company}".
Business unit hint from the user: {unit_hint}

Using the SEARCH CONTEXT below, list the legal entities this name most likely refers to
and the business units / reporting segments of the most likely entity.

Return a JSON object with this EXACT schema (no extra fields):
{
  "entities": [
    {"name": "Agilent Technologies, Inc.", "description": "NYSE: A; life sciences, diagnostics and applied chemical markets"}
  ],
  "business_units": [
    "Life Sciences and Diagnostics Markets Group"
  ]
}

Rules:
- At most 5 entities, most likely first. Use the full legal name.
- Disambiguate look-alikes (same name, different country or industry) in the description.
- At most 8 business units. Prefer the segment names used in annual filings.
- If the search context is empty, answer from general knowledge and keep lists short.

SEARCH CONTEXT:
{search_context}"#;

/// System prompt for the competitive briefing.
pub const REPORT_SYSTEM: &str = "You are a Senior Market Intelligence Analyst. \
    Your goal is to produce a \"Zero-Fluff\" competitive briefing for a sales team. \
    Write in concise markdown. Use markdown tables where the format asks for them. \
    Never pad sections with generic industry commentary.";

/// Briefing prompt. Replace `{company}`, `{unit}`, `{competitors}`, `{context}`,
/// `{grounding_instruction}`, `{search_context}`.
pub const REPORT_PROMPT_TEMPLATE: &str = r#"TARGET: {company}
UNIT: {unit}
COMPETITORS: {competitors}
CONTEXT: {context}

{grounding_instruction}

Answer with strict adherence to the format below.

OUTPUT FORMAT (Use Markdown Tables):

**Section A: Business Unit Health**
- Compare {unit} growth/margins vs {competitors}.
- Rate the health (Positive/Neutral/Negative).

**Section B: Strategic Initiatives**
- Identify 2-3 funded projects (M&A, New Factories, R&D).
- Cite the source (e.g., "Q3 Earnings Call").

**Section C: Risk Radar**
- Cash Flow position.
- Layoff/Restructuring news in last 6 months.
- Top 3 Risk Factors from the 10-K specific to this unit.

**Section D: Soft Signals**
- Leadership changes (C-Suite).
- Hiring hotspots (Locations/Roles).

SEARCH CONTEXT (10-K, earnings, press releases and news gathered for this briefing):
{search_context}"#;
