//! Action Dispatcher: validates an operator action against a pipeline and computes the
//! next record plus the side effects to run once that record is committed.
//!
//! `apply` never touches storage or collaborators. The caller persists `Transition::next`
//! with a compare-and-set on the version, then runs `Transition::hooks`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::collaborators::notifier::NotificationKind;
use crate::models::pipeline::{CandidatePipeline, PipelineStatus};
use crate::pipeline::catalog::StageCatalog;

/// Minimum score that counts as a pass when an evaluation gives no explicit verdict.
pub const PASS_THRESHOLD: u8 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Stage {requested} is not the current stage (current stage is {current})")]
    InvalidStage { requested: u32, current: u32 },

    #[error("Pipeline is {0}; no further stage transitions are permitted")]
    TerminalState(PipelineStatus),

    #[error("Pipeline {0} not found")]
    NotFound(Uuid),

    #[error("Pipeline was modified by another request")]
    ConcurrentModification,

    #[error("Invalid action: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineAction {
    /// Complete the current stage and move on. `expected_stage` guards against acting on a
    /// stale view of the pipeline.
    Advance { expected_stage: Option<u32> },
    Reject { reason: Option<String> },
    /// Record a score, verdict or feedback for the current stage without advancing.
    Evaluate {
        stage_order: u32,
        /// Validated to 0..=100 by `apply`.
        score: Option<i64>,
        passed: Option<bool>,
        feedback: Option<String>,
    },
    /// Back to `in_progress[1]` with all results and generated questions cleared.
    Reset,
}

impl PipelineAction {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineAction::Advance { .. } => "advance",
            PipelineAction::Reject { .. } => "reject",
            PipelineAction::Evaluate { .. } => "evaluate",
            PipelineAction::Reset => "reset",
        }
    }
}

/// Best-effort side effects, executed only after the transition is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum PostCommitHook {
    NotifyCandidate {
        kind: NotificationKind,
        extra_info: Option<String>,
    },
    GenerateQuestions { stage_order: u32 },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub next: CandidatePipeline,
    /// False when the action was a no-op and nothing needs to be written.
    pub changed: bool,
    /// Generated interview questions must be deleted in the same commit.
    pub discards_questions: bool,
    pub hooks: Vec<PostCommitHook>,
}

/// Applies `action` to `pipeline`, returning the next state or the violated precondition.
pub fn apply(
    catalog: &StageCatalog,
    pipeline: &CandidatePipeline,
    action: &PipelineAction,
    now: DateTime<Utc>,
) -> Result<Transition, PipelineError> {
    let mut next = pipeline.clone();
    let mut hooks = Vec::new();
    let mut discards_questions = false;
    let current = pipeline.current_stage_order;

    match action {
        PipelineAction::Advance { expected_stage } => {
            ensure_in_progress(pipeline)?;
            if let Some(requested) = *expected_stage {
                ensure_current(requested, current)?;
            }

            let result = next.result_mut(current);
            result.completed_at = Some(now);
            if result.passed.is_none() {
                result.passed = Some(true);
            }

            if current >= catalog.final_order() {
                next.status = PipelineStatus::Hired;
                hooks.push(PostCommitHook::NotifyCandidate {
                    kind: NotificationKind::Hired,
                    extra_info: catalog.stage(current).map(|s| s.name.clone()),
                });
            } else {
                let entered = current + 1;
                next.current_stage_order = entered;
                let stage = catalog.stage(entered);
                hooks.push(PostCommitHook::NotifyCandidate {
                    kind: NotificationKind::Advanced,
                    extra_info: stage.map(|s| s.name.clone()),
                });
                if stage.is_some_and(|s| s.kind.generates_material()) {
                    hooks.push(PostCommitHook::GenerateQuestions {
                        stage_order: entered,
                    });
                }
            }
        }

        PipelineAction::Reject { reason } => match pipeline.status {
            PipelineStatus::Rejected => {
                return Ok(Transition {
                    next,
                    changed: false,
                    discards_questions,
                    hooks,
                });
            }
            PipelineStatus::Hired => return Err(PipelineError::TerminalState(pipeline.status)),
            PipelineStatus::InProgress => {
                let reason = reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string);
                next.status = PipelineStatus::Rejected;
                next.rejection_reason = reason.clone();
                hooks.push(PostCommitHook::NotifyCandidate {
                    kind: NotificationKind::Rejected,
                    extra_info: reason,
                });
            }
        },

        PipelineAction::Evaluate {
            stage_order,
            score,
            passed,
            feedback,
        } => {
            ensure_in_progress(pipeline)?;
            ensure_current(*stage_order, current)?;
            let score = score
                .map(|raw| {
                    u8::try_from(raw)
                        .ok()
                        .filter(|s| *s <= 100)
                        .ok_or_else(|| {
                            PipelineError::Validation(format!(
                                "score must be between 0 and 100, got {raw}"
                            ))
                        })
                })
                .transpose()?;

            let result = next.result_mut(current);
            if score.is_some() {
                result.score = score;
            }
            if let Some(verdict) = passed.or_else(|| score.map(|s| s >= PASS_THRESHOLD)) {
                result.passed = Some(verdict);
            }
            if feedback.is_some() {
                result.feedback = feedback.clone();
            }
        }

        PipelineAction::Reset => {
            next.current_stage_order = 1;
            next.status = PipelineStatus::InProgress;
            next.rejection_reason = None;
            next.results.clear();
            discards_questions = true;
        }
    }

    next.version = pipeline.version + 1;
    next.updated_at = now;

    Ok(Transition {
        next,
        changed: true,
        discards_questions,
        hooks,
    })
}

/// Rejects actions on rejected or hired pipelines.
pub fn ensure_in_progress(pipeline: &CandidatePipeline) -> Result<(), PipelineError> {
    if pipeline.status.is_terminal() {
        return Err(PipelineError::TerminalState(pipeline.status));
    }
    Ok(())
}

pub fn ensure_current(requested: u32, current: u32) -> Result<(), PipelineError> {
    if requested != current {
        return Err(PipelineError::InvalidStage { requested, current });
    }
    Ok(())
}
