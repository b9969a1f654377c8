//! Progress Evaluator: derives per-stage display status from a pipeline record.
//!
//! Pure functions over the catalog, the current-stage pointer and the stored results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::pipeline::{CandidatePipeline, PipelineStatus, StageResult};
use crate::pipeline::catalog::{Stage, StageCatalog, StageKind};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Current,
    Locked,
    /// The stage a rejected pipeline stopped at. Never produced by `stage_status`.
    Halted,
}

/// Status of a single stage given the pipeline pointer and its results.
///
/// A recorded completion wins; otherwise the pointer decides. Stages behind the
/// pointer count as completed even without a result.
pub fn stage_status(
    stage: &Stage,
    current_stage_order: u32,
    results: &[StageResult],
) -> StageStatus {
    let completed = results
        .iter()
        .any(|r| r.stage_order == stage.order && r.completed_at.is_some());

    if completed {
        StageStatus::Completed
    } else if stage.order == current_stage_order {
        StageStatus::Current
    } else if stage.order < current_stage_order {
        StageStatus::Completed
    } else {
        StageStatus::Locked
    }
}

/// True when `stage` is only completed because the pointer has moved past it.
pub fn is_implicitly_completed(
    stage: &Stage,
    current_stage_order: u32,
    results: &[StageResult],
) -> bool {
    stage.order < current_stage_order
        && !results
            .iter()
            .any(|r| r.stage_order == stage.order && r.completed_at.is_some())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageProgress {
    pub order: u32,
    pub name: String,
    pub kind: StageKind,
    pub status: StageStatus,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Completed without a recorded result.
    pub implicit: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineProgress {
    pub pipeline_id: Uuid,
    pub status: PipelineStatus,
    pub current_stage_order: u32,
    pub completed_stages: usize,
    pub total_stages: usize,
    pub stages: Vec<StageProgress>,
}

impl PipelineProgress {
    pub fn current_stage(&self) -> Option<&StageProgress> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Current)
    }
}

/// Builds the full progress view for one pipeline.
///
/// Terminal pipelines have no `current` stage: a rejected pipeline reports the stage
/// under its pointer as `halted`, a hired one has already completed it.
pub fn evaluate_progress(catalog: &StageCatalog, pipeline: &CandidatePipeline) -> PipelineProgress {
    let current = pipeline.current_stage_order;
    let results = pipeline.results.as_slice();

    let stages: Vec<StageProgress> = catalog
        .stages()
        .iter()
        .map(|stage| {
            let mut status = stage_status(stage, current, results);
            if status == StageStatus::Current {
                status = match pipeline.status {
                    PipelineStatus::InProgress => StageStatus::Current,
                    PipelineStatus::Rejected => StageStatus::Halted,
                    PipelineStatus::Hired => StageStatus::Completed,
                };
            }

            let implicit = is_implicitly_completed(stage, current, results);
            if implicit {
                warn!(
                    pipeline_id = %pipeline.id,
                    stage_order = stage.order,
                    current_stage_order = current,
                    "Stage treated as completed without a recorded result"
                );
            }

            let result = pipeline.result(stage.order);
            StageProgress {
                order: stage.order,
                name: stage.name.clone(),
                kind: stage.kind,
                status,
                score: result.and_then(|r| r.score),
                passed: result.and_then(|r| r.passed),
                completed_at: result.and_then(|r| r.completed_at),
                implicit,
            }
        })
        .collect();

    let completed_stages = stages
        .iter()
        .filter(|s| s.status == StageStatus::Completed)
        .count();

    PipelineProgress {
        pipeline_id: pipeline.id,
        status: pipeline.status,
        current_stage_order: current,
        completed_stages,
        total_stages: catalog.len(),
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn four_stage_catalog() -> StageCatalog {
        StageCatalog::new(vec![
            Stage::new("Resume Screening", 1, ""),
            Stage::new("AI Technical Interview", 2, ""),
            Stage::new("HR Round", 3, ""),
            Stage::new("Offer Stage", 4, ""),
        ])
        .unwrap()
    }

    fn pipeline_at(order: u32, status: PipelineStatus) -> CandidatePipeline {
        let mut pipeline = CandidatePipeline::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        pipeline.current_stage_order = order;
        pipeline.status = status;
        pipeline
    }

    fn completed(pipeline: &mut CandidatePipeline, order: u32) {
        pipeline.result_mut(order).completed_at = Some(Utc::now());
    }

    #[test]
    fn test_stages_behind_pointer_are_completed() {
        let catalog = four_stage_catalog();
        for current in 1..=4 {
            for stage in catalog.stages().iter().filter(|s| s.order < current) {
                assert_eq!(stage_status(stage, current, &[]), StageStatus::Completed);
            }
        }
    }

    #[test]
    fn test_stage_at_pointer_is_current_and_ahead_is_locked() {
        let catalog = four_stage_catalog();
        assert_eq!(
            stage_status(catalog.stage(2).unwrap(), 2, &[]),
            StageStatus::Current
        );
        assert_eq!(
            stage_status(catalog.stage(3).unwrap(), 2, &[]),
            StageStatus::Locked
        );
    }

    #[test]
    fn test_recorded_completion_wins_over_pointer() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(2, PipelineStatus::InProgress);
        completed(&mut pipeline, 2);
        assert_eq!(
            stage_status(catalog.stage(2).unwrap(), 2, &pipeline.results),
            StageStatus::Completed
        );
    }

    #[test]
    fn test_result_without_completion_does_not_complete() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(2, PipelineStatus::InProgress);
        pipeline.result_mut(2).score = Some(80);
        assert_eq!(
            stage_status(catalog.stage(2).unwrap(), 2, &pipeline.results),
            StageStatus::Current
        );
    }

    #[test]
    fn test_out_of_order_completion_only_affects_that_stage() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(1, PipelineStatus::InProgress);
        completed(&mut pipeline, 3);

        let progress = evaluate_progress(&catalog, &pipeline);
        let statuses: Vec<_> = progress.stages.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StageStatus::Current,
                StageStatus::Locked,
                StageStatus::Completed,
                StageStatus::Locked,
            ]
        );
    }

    #[test]
    fn test_exactly_one_current_while_in_progress() {
        let catalog = four_stage_catalog();
        for order in 1..=4 {
            let pipeline = pipeline_at(order, PipelineStatus::InProgress);
            let progress = evaluate_progress(&catalog, &pipeline);
            let current: Vec<_> = progress
                .stages
                .iter()
                .filter(|s| s.status == StageStatus::Current)
                .collect();
            assert_eq!(current.len(), 1);
            assert_eq!(current[0].order, order);
        }
    }

    #[test]
    fn test_terminal_pipelines_have_no_current_stage() {
        let catalog = four_stage_catalog();

        let rejected = evaluate_progress(&catalog, &pipeline_at(3, PipelineStatus::Rejected));
        assert!(rejected.current_stage().is_none());
        assert_eq!(rejected.stages[2].status, StageStatus::Halted);
        assert_eq!(rejected.stages[3].status, StageStatus::Locked);

        let mut hired_pipeline = pipeline_at(4, PipelineStatus::Hired);
        completed(&mut hired_pipeline, 4);
        let hired = evaluate_progress(&catalog, &hired_pipeline);
        assert!(hired.current_stage().is_none());
        assert_eq!(hired.completed_stages, 4);
    }

    #[test]
    fn test_implicit_completion_is_flagged() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(3, PipelineStatus::InProgress);
        completed(&mut pipeline, 1);

        let progress = evaluate_progress(&catalog, &pipeline);
        assert!(!progress.stages[0].implicit);
        assert!(progress.stages[1].implicit);
        assert_eq!(progress.stages[1].status, StageStatus::Completed);
        assert!(!progress.stages[2].implicit);
        assert_eq!(progress.completed_stages, 2);
    }

    #[test]
    fn test_progress_carries_scores() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(2, PipelineStatus::InProgress);
        let result = pipeline.result_mut(2);
        result.score = Some(72);
        result.passed = Some(true);

        let progress = evaluate_progress(&catalog, &pipeline);
        assert_eq!(progress.stages[1].score, Some(72));
        assert_eq!(progress.stages[1].passed, Some(true));
        assert_eq!(progress.total_stages, 4);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let catalog = four_stage_catalog();
        let mut pipeline = pipeline_at(3, PipelineStatus::InProgress);
        completed(&mut pipeline, 2);
        assert_eq!(
            evaluate_progress(&catalog, &pipeline),
            evaluate_progress(&catalog, &pipeline)
        );
    }
}
