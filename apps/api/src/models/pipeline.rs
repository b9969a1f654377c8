use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Overall state of a candidate's interview pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    InProgress,
    Rejected,
    Hired,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::InProgress => "in_progress",
            PipelineStatus::Rejected => "rejected",
            PipelineStatus::Hired => "hired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(PipelineStatus::InProgress),
            "rejected" => Some(PipelineStatus::Rejected),
            "hired" => Some(PipelineStatus::Hired),
            _ => None,
        }
    }

    /// Terminal pipelines accept no further `advance` or `evaluate`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::InProgress)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage for one pipeline. Absence of a result means the stage
/// has not been reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResult {
    pub pipeline_id: Uuid,
    pub stage_order: u32,
    pub completed_at: Option<DateTime<Utc>>,
    /// 0 – 100
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub feedback: Option<String>,
}

impl StageResult {
    pub fn pending(pipeline_id: Uuid, stage_order: u32) -> Self {
        Self {
            pipeline_id,
            stage_order,
            completed_at: None,
            score: None,
            passed: None,
            feedback: None,
        }
    }
}

/// The per-candidate-per-job interview progression record.
///
/// `version` is the optimistic-lock token: every committed transition bumps it
/// by one and the store only accepts a write whose predecessor version matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidatePipeline {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub current_stage_order: u32,
    pub status: PipelineStatus,
    pub rejection_reason: Option<String>,
    /// Ordered by `stage_order`.
    pub results: Vec<StageResult>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidatePipeline {
    /// A freshly shortlisted candidate starts at `in_progress[1]`.
    pub fn new(candidate_id: Uuid, job_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            current_stage_order: 1,
            status: PipelineStatus::InProgress,
            rejection_reason: None,
            results: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn result(&self, stage_order: u32) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage_order == stage_order)
    }

    /// Returns the result for `stage_order`, inserting an empty one in order if absent.
    pub fn result_mut(&mut self, stage_order: u32) -> &mut StageResult {
        let idx = match self.results.binary_search_by_key(&stage_order, |r| r.stage_order) {
            Ok(idx) => idx,
            Err(idx) => {
                let pending = StageResult::pending(self.id, stage_order);
                self.results.insert(idx, pending);
                idx
            }
        };
        &mut self.results[idx]
    }
}

/// A generated interview question attached to a stage of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewQuestion {
    pub question: String,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}

/// Questions generated for one stage of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageQuestions {
    pub stage_order: u32,
    pub questions: Vec<InterviewQuestion>,
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct CandidatePipelineRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub current_stage_order: i32,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StageResultRow {
    pub pipeline_id: Uuid,
    pub stage_order: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i16>,
    pub passed: Option<bool>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StageQuestionRow {
    pub stage_order: i32,
    pub question: String,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}
