//! In-memory `PipelineStore` with the same compare-and-set semantics as Postgres.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::pipeline::{CandidatePipeline, InterviewQuestion, StageQuestions};
use crate::pipeline::store::{PipelineStore, StoreError};

struct Entry {
    pipeline: CandidatePipeline,
    archived: bool,
}

#[derive(Default)]
pub struct MemoryPipelineStore {
    pipelines: Mutex<HashMap<Uuid, Entry>>,
    questions: Mutex<HashMap<Uuid, BTreeMap<u32, Vec<InterviewQuestion>>>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored record, archived or not.
    pub fn snapshot(&self, id: Uuid) -> Option<CandidatePipeline> {
        self.pipelines
            .lock()
            .unwrap()
            .get(&id)
            .map(|e| e.pipeline.clone())
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn create(&self, pipeline: &CandidatePipeline) -> Result<(), StoreError> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let duplicate = pipelines.values().any(|e| {
            !e.archived
                && e.pipeline.candidate_id == pipeline.candidate_id
                && e.pipeline.job_id == pipeline.job_id
        });
        if duplicate {
            return Err(StoreError::Duplicate {
                candidate_id: pipeline.candidate_id,
                job_id: pipeline.job_id,
            });
        }
        pipelines.insert(
            pipeline.id,
            Entry {
                pipeline: pipeline.clone(),
                archived: false,
            },
        );
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<CandidatePipeline>, StoreError> {
        Ok(self
            .pipelines
            .lock()
            .unwrap()
            .get(&id)
            .filter(|e| !e.archived)
            .map(|e| e.pipeline.clone()))
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<CandidatePipeline>, StoreError> {
        let mut listed: Vec<CandidatePipeline> = self
            .pipelines
            .lock()
            .unwrap()
            .values()
            .filter(|e| !e.archived && e.pipeline.job_id == job_id)
            .map(|e| e.pipeline.clone())
            .collect();
        listed.sort_by_key(|p| p.created_at);
        Ok(listed)
    }

    async fn compare_and_swap(
        &self,
        expected_version: i64,
        next: &CandidatePipeline,
        discard_questions: bool,
    ) -> Result<bool, StoreError> {
        let mut pipelines = self.pipelines.lock().unwrap();
        match pipelines.get_mut(&next.id) {
            Some(entry) if !entry.archived && entry.pipeline.version == expected_version => {
                entry.pipeline = next.clone();
                if discard_questions {
                    self.questions.lock().unwrap().remove(&next.id);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut pipelines = self.pipelines.lock().unwrap();
        match pipelines.get_mut(&id) {
            Some(entry) if !entry.archived => {
                entry.archived = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive_job(&self, job_id: Uuid) -> Result<u64, StoreError> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let mut archived = 0;
        for entry in pipelines.values_mut() {
            if !entry.archived && entry.pipeline.job_id == job_id {
                entry.archived = true;
                archived += 1;
            }
        }
        Ok(archived)
    }

    async fn save_questions(
        &self,
        pipeline_id: Uuid,
        stage_order: u32,
        questions: &[InterviewQuestion],
    ) -> Result<(), StoreError> {
        self.questions
            .lock()
            .unwrap()
            .entry(pipeline_id)
            .or_default()
            .insert(stage_order, questions.to_vec());
        Ok(())
    }

    async fn load_questions(&self, pipeline_id: Uuid) -> Result<Vec<StageQuestions>, StoreError> {
        Ok(self
            .questions
            .lock()
            .unwrap()
            .get(&pipeline_id)
            .map(|stages| {
                stages
                    .iter()
                    .map(|(order, questions)| StageQuestions {
                        stage_order: *order,
                        questions: questions.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::pipeline::PipelineStatus;

    fn pipeline() -> CandidatePipeline {
        CandidatePipeline::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[tokio::test]
    async fn test_compare_and_swap_rejects_stale_version() {
        let store = MemoryPipelineStore::new();
        let original = pipeline();
        store.create(&original).await.unwrap();

        let mut first = original.clone();
        first.current_stage_order = 2;
        first.version = 1;
        let mut second = original.clone();
        second.status = PipelineStatus::Rejected;
        second.version = 1;

        assert!(store.compare_and_swap(0, &first, false).await.unwrap());
        assert!(!store.compare_and_swap(0, &second, true).await.unwrap());

        let stored = store.load(original.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stage_order, 2);
        assert_eq!(stored.status, PipelineStatus::InProgress);
    }

    #[tokio::test]
    async fn test_discarding_questions_only_on_successful_swap() {
        let store = MemoryPipelineStore::new();
        let original = pipeline();
        store.create(&original).await.unwrap();
        let question = InterviewQuestion {
            question: "Explain lifetimes".to_string(),
            topic: None,
            difficulty: None,
        };
        store
            .save_questions(original.id, 2, &[question])
            .await
            .unwrap();

        let mut next = original.clone();
        next.version = 1;
        assert!(!store.compare_and_swap(7, &next, true).await.unwrap());
        assert_eq!(store.load_questions(original.id).await.unwrap().len(), 1);

        assert!(store.compare_and_swap(0, &next, true).await.unwrap());
        assert!(store.load_questions(original.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_live_pipeline_is_rejected() {
        let store = MemoryPipelineStore::new();
        let first = pipeline();
        store.create(&first).await.unwrap();

        let again = CandidatePipeline::new(first.candidate_id, first.job_id, Utc::now());
        assert!(matches!(
            store.create(&again).await,
            Err(StoreError::Duplicate { .. })
        ));

        store.archive(first.id).await.unwrap();
        assert!(store.create(&again).await.is_ok());
    }

    #[tokio::test]
    async fn test_archived_pipelines_are_hidden() {
        let store = MemoryPipelineStore::new();
        let first = pipeline();
        store.create(&first).await.unwrap();

        assert!(store.archive(first.id).await.unwrap());
        assert!(!store.archive(first.id).await.unwrap());
        assert!(store.load(first.id).await.unwrap().is_none());
        assert!(store.list_for_job(first.job_id).await.unwrap().is_empty());
        assert!(store.snapshot(first.id).is_some());
    }
}
