// Shared prompt fragments. Each collaborator keeps its own prompts alongside it;
// only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every candidate-facing prompt.
pub const FAIRNESS_INSTRUCTION: &str = "\
    Judge only job-relevant skills and the content of the candidate's answers. \
    Never consider or infer age, gender, ethnicity, religion, disability, or other \
    protected characteristics.";
