//! Candidate interview pipelines: stage catalog, state machine, persistence and side effects.

pub mod catalog;
pub mod dispatcher;
pub mod handlers;
pub mod hooks;
pub mod progress;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod testing;
