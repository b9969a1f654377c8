//! Scriptable collaborator fakes shared by service and handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::collaborators::evaluator::{
    AnswerEvaluation, AnswerEvaluator, AnswerSubmission, RubricContext,
};
use crate::collaborators::notifier::{Notification, Notifier};
use crate::collaborators::questions::{QuestionGenerator, StageContext};
use crate::collaborators::CollaboratorError;
use crate::models::pipeline::InterviewQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    /// Never completes; only a timeout ends the call.
    Hang,
}

impl Behaviour {
    async fn act(self) -> Result<(), CollaboratorError> {
        match self {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err(CollaboratorError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

pub struct FakeNotifier {
    behaviour: Behaviour,
    sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), CollaboratorError> {
        self.behaviour.act().await?;
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FakeQuestionGenerator {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeQuestionGenerator {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for FakeQuestionGenerator {
    async fn generate(
        &self,
        _job_id: Uuid,
        _candidate_id: Uuid,
        stage: &StageContext,
    ) -> Result<Vec<InterviewQuestion>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behaviour.act().await?;
        Ok(vec![
            InterviewQuestion {
                question: format!("Walk through a recent project relevant to {}", stage.stage_name),
                topic: Some("experience".to_string()),
                difficulty: Some("easy".to_string()),
            },
            InterviewQuestion {
                question: "How would you debug a deadlock in production?".to_string(),
                topic: Some("concurrency".to_string()),
                difficulty: Some("hard".to_string()),
            },
        ])
    }
}

/// Scores 70 and 90 on success, an aggregate of 80.
pub struct FakeEvaluator {
    behaviour: Behaviour,
}

impl FakeEvaluator {
    pub fn new(behaviour: Behaviour) -> Self {
        Self { behaviour }
    }
}

#[async_trait]
impl AnswerEvaluator for FakeEvaluator {
    async fn evaluate(
        &self,
        _answers: &[AnswerSubmission],
        _rubric: &RubricContext,
    ) -> Result<AnswerEvaluation, CollaboratorError> {
        self.behaviour.act().await?;
        Ok(AnswerEvaluation {
            scores: vec![70, 90],
            feedback: "fake feedback".to_string(),
            recommendation: "advance".to_string(),
        })
    }
}
