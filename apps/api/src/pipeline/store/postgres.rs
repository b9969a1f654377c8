use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::pipeline::{
    CandidatePipeline, CandidatePipelineRow, InterviewQuestion, PipelineStatus, StageQuestionRow,
    StageQuestions, StageResult, StageResultRow,
};
use crate::pipeline::store::{PipelineStore, StoreError};

const PIPELINE_COLUMNS: &str = "id, candidate_id, job_id, current_stage_order, status, \
    rejection_reason, version, created_at, updated_at";

const RESULT_COLUMNS: &str = "pipeline_id, stage_order, completed_at, score, passed, feedback";

pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn create(&self, pipeline: &CandidatePipeline) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO candidate_pipelines
                (id, candidate_id, job_id, current_stage_order, status,
                 rejection_reason, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(pipeline.id)
        .bind(pipeline.candidate_id)
        .bind(pipeline.job_id)
        .bind(pipeline.current_stage_order as i32)
        .bind(pipeline.status.as_str())
        .bind(&pipeline.rejection_reason)
        .bind(pipeline.version)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &inserted {
            if db_err.is_unique_violation() {
                return Err(StoreError::Duplicate {
                    candidate_id: pipeline.candidate_id,
                    job_id: pipeline.job_id,
                });
            }
        }
        inserted?;

        insert_results(&mut tx, pipeline).await?;
        tx.commit().await?;

        info!(pipeline_id = %pipeline.id, "Pipeline created");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<CandidatePipeline>, StoreError> {
        let row = sqlx::query_as::<_, CandidatePipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM candidate_pipelines \
             WHERE id = $1 AND archived_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let results = sqlx::query_as::<_, StageResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM stage_results WHERE pipeline_id = $1 ORDER BY stage_order"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        into_pipeline(row, results).map(Some)
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<CandidatePipeline>, StoreError> {
        let rows = sqlx::query_as::<_, CandidatePipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM candidate_pipelines \
             WHERE job_id = $1 AND archived_at IS NULL ORDER BY created_at"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let results = sqlx::query_as::<_, StageResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM stage_results \
             WHERE pipeline_id = ANY($1) ORDER BY pipeline_id, stage_order"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_pipeline: HashMap<Uuid, Vec<StageResultRow>> = HashMap::new();
        for result in results {
            by_pipeline.entry(result.pipeline_id).or_default().push(result);
        }

        rows.into_iter()
            .map(|row| {
                let own = by_pipeline.remove(&row.id).unwrap_or_default();
                into_pipeline(row, own)
            })
            .collect()
    }

    async fn compare_and_swap(
        &self,
        expected_version: i64,
        next: &CandidatePipeline,
        discard_questions: bool,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE candidate_pipelines
            SET current_stage_order = $3,
                status = $4,
                rejection_reason = $5,
                version = $6,
                updated_at = $7
            WHERE id = $1 AND version = $2 AND archived_at IS NULL
            "#,
        )
        .bind(next.id)
        .bind(expected_version)
        .bind(next.current_stage_order as i32)
        .bind(next.status.as_str())
        .bind(&next.rejection_reason)
        .bind(next.version)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(pipeline_id = %next.id, expected_version, "Version conflict");
            return Ok(false);
        }

        sqlx::query("DELETE FROM stage_results WHERE pipeline_id = $1")
            .bind(next.id)
            .execute(&mut *tx)
            .await?;
        insert_results(&mut tx, next).await?;

        if discard_questions {
            sqlx::query("DELETE FROM stage_questions WHERE pipeline_id = $1")
                .bind(next.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn archive(&self, id: Uuid) -> Result<bool, StoreError> {
        let archived = sqlx::query(
            "UPDATE candidate_pipelines SET archived_at = now() \
             WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(archived.rows_affected() > 0)
    }

    async fn archive_job(&self, job_id: Uuid) -> Result<u64, StoreError> {
        let archived = sqlx::query(
            "UPDATE candidate_pipelines SET archived_at = now() \
             WHERE job_id = $1 AND archived_at IS NULL",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(archived.rows_affected())
    }

    async fn save_questions(
        &self,
        pipeline_id: Uuid,
        stage_order: u32,
        questions: &[InterviewQuestion],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM stage_questions WHERE pipeline_id = $1 AND stage_order = $2")
            .bind(pipeline_id)
            .bind(stage_order as i32)
            .execute(&mut *tx)
            .await?;

        for (position, question) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stage_questions
                    (id, pipeline_id, stage_order, position, question, topic, difficulty)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(pipeline_id)
            .bind(stage_order as i32)
            .bind(position as i32)
            .bind(&question.question)
            .bind(&question.topic)
            .bind(&question.difficulty)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_questions(&self, pipeline_id: Uuid) -> Result<Vec<StageQuestions>, StoreError> {
        let rows = sqlx::query_as::<_, StageQuestionRow>(
            "SELECT stage_order, question, topic, difficulty FROM stage_questions \
             WHERE pipeline_id = $1 ORDER BY stage_order, position",
        )
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: Vec<StageQuestions> = Vec::new();
        for row in rows {
            let stage_order = to_order(row.stage_order)?;
            let question = InterviewQuestion {
                question: row.question,
                topic: row.topic,
                difficulty: row.difficulty,
            };
            match grouped.last_mut() {
                Some(group) if group.stage_order == stage_order => group.questions.push(question),
                _ => grouped.push(StageQuestions {
                    stage_order,
                    questions: vec![question],
                }),
            }
        }
        Ok(grouped)
    }
}

async fn insert_results(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    pipeline: &CandidatePipeline,
) -> Result<(), StoreError> {
    for result in &pipeline.results {
        sqlx::query(
            r#"
            INSERT INTO stage_results
                (pipeline_id, stage_order, completed_at, score, passed, feedback)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(pipeline.id)
        .bind(result.stage_order as i32)
        .bind(result.completed_at)
        .bind(result.score.map(i16::from))
        .bind(result.passed)
        .bind(&result.feedback)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn to_order(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value)
        .ok()
        .filter(|order| *order >= 1)
        .ok_or_else(|| StoreError::Corrupt(format!("stage order {value} is out of range")))
}

fn into_pipeline(
    row: CandidatePipelineRow,
    results: Vec<StageResultRow>,
) -> Result<CandidatePipeline, StoreError> {
    let status = PipelineStatus::parse(&row.status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", row.status)))?;

    let results = results
        .into_iter()
        .map(|r| {
            let score = r
                .score
                .map(|s| {
                    u8::try_from(s)
                        .ok()
                        .filter(|s| *s <= 100)
                        .ok_or_else(|| StoreError::Corrupt(format!("score {s} is out of range")))
                })
                .transpose()?;
            Ok(StageResult {
                pipeline_id: r.pipeline_id,
                stage_order: to_order(r.stage_order)?,
                completed_at: r.completed_at,
                score,
                passed: r.passed,
                feedback: r.feedback,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok(CandidatePipeline {
        id: row.id,
        candidate_id: row.candidate_id,
        job_id: row.job_id,
        current_stage_order: to_order(row.current_stage_order)?,
        status,
        rejection_reason: row.rejection_reason,
        results,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
