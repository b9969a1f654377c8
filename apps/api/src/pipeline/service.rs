//! Pipeline Service: load, dispatch, commit with compare-and-set, then run hooks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::evaluator::{
    AnswerEvaluation, AnswerEvaluator, AnswerSubmission, RubricContext,
};
use crate::errors::AppError;
use crate::models::pipeline::{CandidatePipeline, StageQuestions};
use crate::pipeline::catalog::StageCatalog;
use crate::pipeline::dispatcher::{self, PipelineAction, PipelineError};
use crate::pipeline::hooks::{CollaboratorWarning, HookRunner};
use crate::pipeline::progress::{evaluate_progress, PipelineProgress};
use crate::pipeline::store::PipelineStore;

/// Operator action as received over HTTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Advance {
        #[serde(default)]
        expected_stage: Option<u32>,
    },
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Either an operator score or a set of answers for an AI-graded stage.
    Evaluate {
        stage_order: u32,
        /// Range-checked by the dispatcher so out-of-range values get a validation error.
        #[serde(default)]
        score: Option<i64>,
        #[serde(default)]
        passed: Option<bool>,
        #[serde(default)]
        feedback: Option<String>,
        #[serde(default)]
        answers: Vec<AnswerSubmission>,
    },
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineView {
    pub pipeline: CandidatePipeline,
    pub progress: PipelineProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub pipeline: CandidatePipeline,
    pub progress: PipelineProgress,
    /// False when the action was an idempotent no-op.
    pub changed: bool,
    pub evaluation: Option<AnswerEvaluation>,
    pub questions: Vec<StageQuestions>,
    pub warnings: Vec<CollaboratorWarning>,
}

#[derive(Clone)]
pub struct PipelineService {
    store: Arc<dyn PipelineStore>,
    catalog: Arc<StageCatalog>,
    evaluator: Arc<dyn AnswerEvaluator>,
    hooks: HookRunner,
    collaborator_timeout: Duration,
}

impl PipelineService {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        catalog: Arc<StageCatalog>,
        evaluator: Arc<dyn AnswerEvaluator>,
        hooks: HookRunner,
        collaborator_timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            evaluator,
            hooks,
            collaborator_timeout,
        }
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Shortlists a candidate into a job's interview process at `in_progress[1]`.
    pub async fn create_pipeline(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<PipelineView, AppError> {
        let pipeline = CandidatePipeline::new(candidate_id, job_id, Utc::now());
        self.store.create(&pipeline).await?;
        info!(pipeline_id = %pipeline.id, %candidate_id, %job_id, "Candidate shortlisted");
        Ok(self.view(pipeline))
    }

    pub async fn get_pipeline(&self, id: Uuid) -> Result<PipelineView, AppError> {
        let pipeline = self.load(id).await?;
        Ok(self.view(pipeline))
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<PipelineView>, AppError> {
        let pipelines = self.store.list_for_job(job_id).await?;
        Ok(pipelines.into_iter().map(|p| self.view(p)).collect())
    }

    pub async fn archive_pipeline(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.archive(id).await? {
            return Err(PipelineError::NotFound(id).into());
        }
        info!(pipeline_id = %id, "Pipeline archived");
        Ok(())
    }

    /// Archives every live pipeline of a closed job.
    pub async fn close_job(&self, job_id: Uuid) -> Result<u64, AppError> {
        let archived = self.store.archive_job(job_id).await?;
        info!(%job_id, archived, "Job closed");
        Ok(archived)
    }

    pub async fn questions(&self, id: Uuid) -> Result<Vec<StageQuestions>, AppError> {
        self.load(id).await?;
        Ok(self.store.load_questions(id).await?)
    }

    /// Validates and commits one operator action, then runs its side effects.
    pub async fn perform(
        &self,
        id: Uuid,
        request: ActionRequest,
    ) -> Result<ActionOutcome, AppError> {
        let pipeline = self.load(id).await?;
        let mut warnings = Vec::new();
        let mut evaluation = None;

        let action = match request {
            ActionRequest::Advance { expected_stage } => PipelineAction::Advance { expected_stage },
            ActionRequest::Reject { reason } => PipelineAction::Reject { reason },
            ActionRequest::Reset => PipelineAction::Reset,
            ActionRequest::Evaluate {
                stage_order,
                score,
                passed,
                feedback,
                answers,
            } => {
                if score.is_some() || answers.is_empty() {
                    PipelineAction::Evaluate {
                        stage_order,
                        score,
                        passed,
                        feedback,
                    }
                } else {
                    let graded = self.grade_answers(&pipeline, stage_order, &answers).await?;
                    let (score, feedback) = match graded {
                        Ok(result) => {
                            let score = result.aggregate_score().map(i64::from);
                            let feedback = feedback.or_else(|| Some(result.feedback.clone()));
                            evaluation = Some(result);
                            (score, feedback)
                        }
                        Err(warning) => {
                            warnings.push(warning);
                            (None, feedback)
                        }
                    };
                    PipelineAction::Evaluate {
                        stage_order,
                        score,
                        passed,
                        feedback,
                    }
                }
            }
        };

        let transition = dispatcher::apply(&self.catalog, &pipeline, &action, Utc::now())?;
        let progress = evaluate_progress(&self.catalog, &transition.next);

        if transition.changed {
            let committed = self
                .store
                .compare_and_swap(
                    pipeline.version,
                    &transition.next,
                    transition.discards_questions,
                )
                .await?;
            if !committed {
                warn!(
                    pipeline_id = %id,
                    action = action.name(),
                    version = pipeline.version,
                    "Pipeline changed underneath the action"
                );
                return Err(PipelineError::ConcurrentModification.into());
            }

            info!(
                pipeline_id = %id,
                action = action.name(),
                status = %transition.next.status,
                current_stage = ?progress.current_stage().map(|s| s.name.as_str()),
                "Pipeline action committed"
            );
        }

        let report = self
            .hooks
            .run(&self.catalog, &transition.next, transition.hooks)
            .await;
        warnings.extend(report.warnings);

        Ok(ActionOutcome {
            progress,
            pipeline: transition.next,
            changed: transition.changed,
            evaluation,
            questions: report.questions,
            warnings,
        })
    }

    /// Scores answers with the AI evaluator. Precondition failures are errors; evaluator
    /// failures come back as a warning so the evaluation is still recorded.
    async fn grade_answers(
        &self,
        pipeline: &CandidatePipeline,
        stage_order: u32,
        answers: &[AnswerSubmission],
    ) -> Result<Result<AnswerEvaluation, CollaboratorWarning>, AppError> {
        dispatcher::ensure_in_progress(pipeline)?;
        dispatcher::ensure_current(stage_order, pipeline.current_stage_order)?;

        let stage = self.catalog.stage(stage_order).ok_or_else(|| {
            AppError::Validation(format!("stage {stage_order} is not in the catalog"))
        })?;
        if !stage.kind.ai_graded() {
            return Err(AppError::Validation(format!(
                "stage '{}' is not AI graded; supply a score instead of answers",
                stage.name
            )));
        }

        let rubric = RubricContext {
            stage_name: stage.name.clone(),
            stage_description: stage.description.clone(),
        };

        let graded = tokio::time::timeout(
            self.collaborator_timeout,
            self.evaluator.evaluate(answers, &rubric),
        )
        .await;

        Ok(match graded {
            Ok(Ok(evaluation)) => Ok(evaluation),
            Ok(Err(e)) => {
                warn!(pipeline_id = %pipeline.id, stage_order, "Answer evaluation failed: {e}");
                Err(CollaboratorWarning::unavailable("answer_evaluation", e.to_string()))
            }
            Err(_) => {
                warn!(pipeline_id = %pipeline.id, stage_order, "Answer evaluation timed out");
                Err(CollaboratorWarning::unavailable(
                    "answer_evaluation",
                    format!("timed out after {}s", self.collaborator_timeout.as_secs_f64()),
                ))
            }
        })
    }

    async fn load(&self, id: Uuid) -> Result<CandidatePipeline, AppError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id).into())
    }

    fn view(&self, pipeline: CandidatePipeline) -> PipelineView {
        PipelineView {
            progress: evaluate_progress(&self.catalog, &pipeline),
            pipeline,
        }
    }
}
