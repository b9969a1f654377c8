pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/stages", get(handlers::handle_list_stages))
        // Candidate pipelines
        .route(
            "/api/v1/pipelines",
            get(handlers::handle_list_pipelines).post(handlers::handle_create_pipeline),
        )
        .route(
            "/api/v1/pipelines/:id",
            get(handlers::handle_get_pipeline).delete(handlers::handle_archive_pipeline),
        )
        .route(
            "/api/v1/pipelines/:id/actions",
            post(handlers::handle_pipeline_action),
        )
        .route(
            "/api/v1/pipelines/:id/questions",
            get(handlers::handle_get_questions),
        )
        // Jobs
        .route("/api/v1/jobs/:job_id/close", post(handlers::handle_close_job))
        .with_state(state)
}
