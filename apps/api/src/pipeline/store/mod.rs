//! Persistence for candidate pipelines.
//!
//! All writes to an existing pipeline go through `compare_and_swap`, which only succeeds
//! when the stored version still equals the version the caller read. Two concurrent
//! `advance` calls therefore cannot both commit.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::pipeline::{CandidatePipeline, InterviewQuestion, StageQuestions};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgPipelineStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Candidate {candidate_id} already has an active pipeline for job {job_id}")]
    Duplicate { candidate_id: Uuid, job_id: Uuid },

    #[error("Stored pipeline record is invalid: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Inserts a new pipeline. Fails with `Duplicate` if the candidate already has a live
    /// pipeline for the job.
    async fn create(&self, pipeline: &CandidatePipeline) -> Result<(), StoreError>;

    /// Loads a live (non-archived) pipeline with its results.
    async fn load(&self, id: Uuid) -> Result<Option<CandidatePipeline>, StoreError>;

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<CandidatePipeline>, StoreError>;

    /// Replaces the stored pipeline with `next` if its version is still `expected_version`.
    /// With `discard_questions`, the pipeline's generated questions are deleted in the same
    /// write. Returns `false` on a version conflict, leaving storage untouched.
    async fn compare_and_swap(
        &self,
        expected_version: i64,
        next: &CandidatePipeline,
        discard_questions: bool,
    ) -> Result<bool, StoreError>;

    /// Archives one pipeline. Returns `false` if it was unknown or already archived.
    async fn archive(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Archives every live pipeline of a job, returning how many were archived.
    async fn archive_job(&self, job_id: Uuid) -> Result<u64, StoreError>;

    /// Replaces the generated questions for one stage of a pipeline.
    async fn save_questions(
        &self,
        pipeline_id: Uuid,
        stage_order: u32,
        questions: &[InterviewQuestion],
    ) -> Result<(), StoreError>;

    async fn load_questions(&self, pipeline_id: Uuid) -> Result<Vec<StageQuestions>, StoreError>;
}
