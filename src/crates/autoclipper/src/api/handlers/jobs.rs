//! /jobs handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::models::{
    CancelResponse, CreateJobRequest, JobStatusResponse, ListJobsQuery, ReorderRequest, ReorderResponse,
};
use crate::api::routes::AppState;
use crate::db::models::Job;
use crate::db::JobStatusUpdate;
use crate::input::InputNormalizer;
use crate::CoreError;

const MAX_LOCAL_FILE_GIB: u64 = 16;

fn generate_job_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub async fn create_job(State(state): State<AppState>, Json(req): Json<CreateJobRequest>) -> ApiResult<(StatusCode, Json<Job>)> {
    let normalizer = InputNormalizer::new(MAX_LOCAL_FILE_GIB);
    let source = normalizer.normalize(&req.source_url)?;

    let job_id = generate_job_id();
    let source_type = match source.source_type {
        crate::input::SourceType::Youtube => "youtube",
        crate::input::SourceType::Local => "local",
    };

    let job = state
        .jobs
        .create_job(&job_id, &source.normalized_input, source_type, req.user_id.as_deref(), None)
        .await?;

    if !state.queue.enqueue(&job.id).await {
        return Err(CoreError::Conflict(format!("job {} is already queued", job.id)).into());
    }

    let job = state
        .jobs
        .update_job_status(
            &job.id,
            JobStatusUpdate { status: "queued", current_stage: Some("queued"), progress_pct: Some(0), ..Default::default() },
        )
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {} not found", job.id)))?;

    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> ApiResult<Json<Vec<Job>>> {
    let jobs = state.jobs.list_jobs(query.limit, query.offset).await?;
    Ok(Json(jobs))
}

pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Job>> {
    let job = state
        .jobs
        .get_job(&job_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {job_id} not found")))?;
    Ok(Json(job))
}

pub async fn get_job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .jobs
        .get_job(&job_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {job_id} not found")))?;

    Ok(Json(JobStatusResponse {
        id: job.id,
        status: job.status,
        progress_pct: job.progress_pct,
        current_stage: job.current_stage,
        error_msg: job.error_msg,
    }))
}

pub async fn cancel_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<CancelResponse>> {
    state
        .jobs
        .get_job(&job_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {job_id} not found")))?;

    let accepted = state.queue.cancel(&job_id).await;
    Ok(Json(CancelResponse { id: job_id, accepted }))
}

pub async fn reorder_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<ReorderResponse>> {
    state
        .jobs
        .get_job(&job_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {job_id} not found")))?;

    let accepted = state.queue.reorder(&job_id, req.index).await;
    Ok(Json(ReorderResponse { id: job_id, accepted }))
}
