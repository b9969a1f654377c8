//! External services the pipeline consumes but does not own.
//!
//! Every collaborator sits behind a trait so `AppState` can hold `Arc<dyn ...>` and tests
//! can substitute fakes. Failures are reported as `CollaboratorError` and never abort a
//! committed pipeline transition.

use thiserror::Error;

use crate::llm_client::LlmError;

pub mod evaluator;
pub mod notifier;
pub mod prompts;
pub mod questions;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
