// Prompt templates for the interview AI collaborators.

pub const QUESTION_SYSTEM: &str = "\
You are an experienced technical interviewer preparing a structured interview. \
Write clear, self-contained questions that can be answered verbally in a few minutes. \
Mix fundamentals with applied, scenario-based questions.";

/// Replace `{stage_name}`, `{stage_description}`, `{job_id}` and `{count}` before sending.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Prepare interview questions for the "{stage_name}" stage.

STAGE DESCRIPTION:
{stage_description}

JOB REFERENCE: {job_id}

Return a JSON object with this EXACT schema:
{
  "questions": [
    {"question": "string", "topic": "string" | null, "difficulty": "easy" | "medium" | "hard" | null}
  ]
}

RULES:
1. Return exactly {count} questions.
2. Each question must stand on its own without reference to other questions.
3. Return ONLY the JSON object."#;

pub const EVALUATION_SYSTEM: &str = "\
You are a fair, consistent interview assessor. \
Score each answer independently against the rubric on a 0-100 scale. \
Be specific in feedback and cite what the candidate said.";

/// Replace `{stage_name}`, `{rubric}` and `{answers}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the candidate's answers for the "{stage_name}" stage.

RUBRIC:
{rubric}

ANSWERS (JSON array of question/answer pairs):
{answers}

Return a JSON object with this EXACT schema:
{
  "scores": [number],
  "feedback": "string",
  "recommendation": "advance" | "hold" | "reject"
}

RULES:
1. "scores" has exactly one entry per answer, in the same order, each between 0 and 100.
2. An empty or off-topic answer scores 0.
3. Return ONLY the JSON object."#;
