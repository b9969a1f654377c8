//! Post-commit hooks: best-effort side effects run after a transition is stored.
//!
//! Each hook runs on its own task under a timeout. A failed or slow hook produces a
//! `CollaboratorWarning` and never affects the committed pipeline state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::notifier::{Notification, Notifier};
use crate::collaborators::questions::{QuestionGenerator, StageContext, DEFAULT_QUESTION_COUNT};
use crate::models::pipeline::{CandidatePipeline, StageQuestions};
use crate::pipeline::catalog::StageCatalog;
use crate::pipeline::dispatcher::PostCommitHook;
use crate::pipeline::store::PipelineStore;

/// Non-fatal diagnostic attached to an otherwise successful response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollaboratorWarning {
    pub kind: &'static str,
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorWarning {
    pub fn unavailable(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: "collaborator_unavailable",
            collaborator,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct HookReport {
    pub warnings: Vec<CollaboratorWarning>,
    pub questions: Vec<StageQuestions>,
}

enum HookOutcome {
    Done,
    Questions(StageQuestions),
    Failed(CollaboratorWarning),
}

#[derive(Clone)]
pub struct HookRunner {
    notifier: Arc<dyn Notifier>,
    question_generator: Arc<dyn QuestionGenerator>,
    store: Arc<dyn PipelineStore>,
    timeout: Duration,
}

impl HookRunner {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        question_generator: Arc<dyn QuestionGenerator>,
        store: Arc<dyn PipelineStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifier,
            question_generator,
            store,
            timeout,
        }
    }

    /// Runs all hooks concurrently and collects their warnings and generated material.
    pub async fn run(
        &self,
        catalog: &StageCatalog,
        pipeline: &CandidatePipeline,
        hooks: Vec<PostCommitHook>,
    ) -> HookReport {
        let mut tasks = JoinSet::new();

        for hook in hooks {
            let runner = self.clone();
            match hook {
                PostCommitHook::NotifyCandidate { kind, extra_info } => {
                    let notification = Notification {
                        candidate_id: pipeline.candidate_id,
                        job_id: pipeline.job_id,
                        status_kind: kind,
                        extra_info,
                    };
                    tasks.spawn(async move { runner.notify(notification).await });
                }
                PostCommitHook::GenerateQuestions { stage_order } => {
                    let Some(stage) = catalog.stage(stage_order) else {
                        warn!(stage_order, "Question generation requested for unknown stage");
                        continue;
                    };
                    let context = StageContext {
                        stage_order,
                        stage_name: stage.name.clone(),
                        stage_description: stage.description.clone(),
                        question_count: DEFAULT_QUESTION_COUNT,
                    };
                    let (pipeline_id, job_id, candidate_id) =
                        (pipeline.id, pipeline.job_id, pipeline.candidate_id);
                    tasks.spawn(async move {
                        runner
                            .generate_questions(pipeline_id, job_id, candidate_id, context)
                            .await
                    });
                }
            }
        }

        let mut report = HookReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(HookOutcome::Done) => {}
                Ok(HookOutcome::Questions(questions)) => report.questions.push(questions),
                Ok(HookOutcome::Failed(warning)) => report.warnings.push(warning),
                Err(e) => {
                    warn!(pipeline_id = %pipeline.id, "Post-commit hook task failed: {e}");
                    report
                        .warnings
                        .push(CollaboratorWarning::unavailable("hook", e.to_string()));
                }
            }
        }
        report
    }

    async fn notify(self, notification: Notification) -> HookOutcome {
        match tokio::time::timeout(self.timeout, self.notifier.send(&notification)).await {
            Ok(Ok(())) => HookOutcome::Done,
            Ok(Err(e)) => {
                warn!(
                    candidate_id = %notification.candidate_id,
                    "Candidate notification failed: {e}"
                );
                HookOutcome::Failed(CollaboratorWarning::unavailable(
                    "notification",
                    e.to_string(),
                ))
            }
            Err(_) => {
                warn!(
                    candidate_id = %notification.candidate_id,
                    "Candidate notification timed out"
                );
                HookOutcome::Failed(CollaboratorWarning::unavailable(
                    "notification",
                    timeout_message(self.timeout),
                ))
            }
        }
    }

    async fn generate_questions(
        self,
        pipeline_id: Uuid,
        job_id: Uuid,
        candidate_id: Uuid,
        context: StageContext,
    ) -> HookOutcome {
        let generated = tokio::time::timeout(
            self.timeout,
            self.question_generator.generate(job_id, candidate_id, &context),
        )
        .await;

        let questions = match generated {
            Ok(Ok(questions)) => questions,
            Ok(Err(e)) => {
                warn!(
                    %pipeline_id,
                    stage_order = context.stage_order,
                    "Question generation failed: {e}"
                );
                return HookOutcome::Failed(CollaboratorWarning::unavailable(
                    "question_generation",
                    e.to_string(),
                ));
            }
            Err(_) => {
                warn!(
                    %pipeline_id,
                    stage_order = context.stage_order,
                    "Question generation timed out"
                );
                return HookOutcome::Failed(CollaboratorWarning::unavailable(
                    "question_generation",
                    timeout_message(self.timeout),
                ));
            }
        };

        if let Err(e) = self
            .store
            .save_questions(pipeline_id, context.stage_order, &questions)
            .await
        {
            warn!(%pipeline_id, "Failed to persist generated questions: {e}");
            return HookOutcome::Failed(CollaboratorWarning::unavailable(
                "question_generation",
                format!("questions generated but not saved: {e}"),
            ));
        }

        info!(
            %pipeline_id,
            stage_order = context.stage_order,
            count = questions.len(),
            "Interview questions ready"
        );
        HookOutcome::Questions(StageQuestions {
            stage_order: context.stage_order,
            questions,
        })
    }
}

fn timeout_message(timeout: Duration) -> String {
    format!("timed out after {}s", timeout.as_secs_f64())
}
