//! Interview question generation for AI-driven stages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::collaborators::prompts::{QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM};
use crate::collaborators::CollaboratorError;
use crate::llm_client::prompts::{FAIRNESS_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::pipeline::InterviewQuestion;

/// Default number of questions requested per stage.
pub const DEFAULT_QUESTION_COUNT: usize = 5;

/// What the generator knows about the stage being entered.
#[derive(Debug, Clone, Serialize)]
pub struct StageContext {
    pub stage_order: u32,
    pub stage_name: String,
    pub stage_description: String,
    pub question_count: usize,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
        stage: &StageContext,
    ) -> Result<Vec<InterviewQuestion>, CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct QuestionReply {
    questions: Vec<InterviewQuestion>,
}

pub struct LlmQuestionGenerator {
    llm: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
        stage: &StageContext,
    ) -> Result<Vec<InterviewQuestion>, CollaboratorError> {
        let prompt = build_question_prompt(job_id, stage);
        let system = format!("{QUESTION_SYSTEM} {FAIRNESS_INSTRUCTION} {JSON_ONLY_SYSTEM}");

        let reply: QuestionReply = self.llm.complete_json(&prompt, &system).await?;
        let questions = clean_questions(reply.questions, stage.question_count);
        if questions.is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "no usable questions returned".to_string(),
            ));
        }

        debug!(
            %candidate_id,
            stage_order = stage.stage_order,
            count = questions.len(),
            "Generated interview questions"
        );
        Ok(questions)
    }
}

fn build_question_prompt(job_id: Uuid, stage: &StageContext) -> String {
    QUESTION_PROMPT_TEMPLATE
        .replace("{stage_name}", &stage.stage_name)
        .replace("{stage_description}", &stage.stage_description)
        .replace("{job_id}", &job_id.to_string())
        .replace("{count}", &stage.question_count.to_string())
}

/// Trims text, drops blank questions and caps the list at `limit`.
fn clean_questions(questions: Vec<InterviewQuestion>, limit: usize) -> Vec<InterviewQuestion> {
    questions
        .into_iter()
        .filter_map(|q| {
            let question = q.question.trim().to_string();
            if question.is_empty() {
                return None;
            }
            Some(InterviewQuestion {
                question,
                topic: q.topic.filter(|t| !t.trim().is_empty()),
                difficulty: q.difficulty.map(|d| d.trim().to_lowercase()),
            })
        })
        .take(limit)
        .collect()
}
