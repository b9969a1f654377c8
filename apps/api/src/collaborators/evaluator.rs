//! AI grading of interview answers for AI-graded stages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};
use crate::collaborators::CollaboratorError;
use crate::llm_client::prompts::{FAIRNESS_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerSubmission {
    pub question: String,
    pub answer: String,
}

/// What the answers are graded against.
#[derive(Debug, Clone, Serialize)]
pub struct RubricContext {
    pub stage_name: String,
    pub stage_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerEvaluation {
    /// One 0 – 100 score per submitted answer, in submission order.
    pub scores: Vec<u8>,
    pub feedback: String,
    pub recommendation: String,
}

impl AnswerEvaluation {
    /// Rounded mean of the per-answer scores. `None` when nothing was scored.
    pub fn aggregate_score(&self) -> Option<u8> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: u32 = self.scores.iter().map(|&s| u32::from(s.min(100))).sum();
        let mean = sum as f64 / self.scores.len() as f64;
        Some(mean.round() as u8)
    }
}

#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        answers: &[AnswerSubmission],
        rubric: &RubricContext,
    ) -> Result<AnswerEvaluation, CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct EvaluationReply {
    scores: Vec<f64>,
    feedback: String,
    recommendation: String,
}

pub struct LlmAnswerEvaluator {
    llm: LlmClient,
}

impl LlmAnswerEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnswerEvaluator for LlmAnswerEvaluator {
    async fn evaluate(
        &self,
        answers: &[AnswerSubmission],
        rubric: &RubricContext,
    ) -> Result<AnswerEvaluation, CollaboratorError> {
        let answers_json = serde_json::to_string_pretty(answers)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{stage_name}", &rubric.stage_name)
            .replace("{rubric}", &rubric.stage_description)
            .replace("{answers}", &answers_json);
        let system = format!("{EVALUATION_SYSTEM} {FAIRNESS_INSTRUCTION} {JSON_ONLY_SYSTEM}");

        let reply: EvaluationReply = self.llm.complete_json(&prompt, &system).await?;
        into_evaluation(reply, answers.len())
    }
}

fn into_evaluation(
    reply: EvaluationReply,
    expected_scores: usize,
) -> Result<AnswerEvaluation, CollaboratorError> {
    if reply.scores.len() != expected_scores {
        return Err(CollaboratorError::InvalidResponse(format!(
            "expected {expected_scores} scores, got {}",
            reply.scores.len()
        )));
    }

    Ok(AnswerEvaluation {
        scores: reply
            .scores
            .iter()
            .map(|s| s.clamp(0.0, 100.0).round() as u8)
            .collect(),
        feedback: reply.feedback.trim().to_string(),
        recommendation: reply.recommendation.trim().to_lowercase(),
    })
}
