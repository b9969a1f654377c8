use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pipeline::StageQuestions;
use crate::pipeline::catalog::Stage;
use crate::pipeline::service::{ActionOutcome, ActionRequest, PipelineView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct JobIdQuery {
    pub job_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreatePipelineRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct CloseJobResponse {
    pub job_id: Uuid,
    pub archived: u64,
}

/// GET /api/v1/stages
pub async fn handle_list_stages(State(state): State<AppState>) -> Json<Vec<Stage>> {
    Json(state.pipelines.catalog().stages().to_vec())
}

/// POST /api/v1/pipelines
pub async fn handle_create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipelineRequest>,
) -> Result<(StatusCode, Json<PipelineView>), AppError> {
    let view = state
        .pipelines
        .create_pipeline(req.candidate_id, req.job_id)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/pipelines?job_id=
pub async fn handle_list_pipelines(
    State(state): State<AppState>,
    Query(params): Query<JobIdQuery>,
) -> Result<Json<Vec<PipelineView>>, AppError> {
    let views = state.pipelines.list_for_job(params.job_id).await?;
    Ok(Json(views))
}

/// GET /api/v1/pipelines/:id
pub async fn handle_get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PipelineView>, AppError> {
    Ok(Json(state.pipelines.get_pipeline(id).await?))
}

/// DELETE /api/v1/pipelines/:id
pub async fn handle_archive_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.pipelines.archive_pipeline(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/pipelines/:id/actions
pub async fn handle_pipeline_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    let outcome = state.pipelines.perform(id, req).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/pipelines/:id/questions
pub async fn handle_get_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StageQuestions>>, AppError> {
    Ok(Json(state.pipelines.questions(id).await?))
}

/// POST /api/v1/jobs/:job_id/close
pub async fn handle_close_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<CloseJobResponse>, AppError> {
    let archived = state.pipelines.close_job(job_id).await?;
    Ok(Json(CloseJobResponse { job_id, archived }))
}
