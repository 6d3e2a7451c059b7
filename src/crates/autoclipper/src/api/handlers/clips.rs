//! /clips handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::api::models::ClipPreviewResponse;
use crate::api::routes::AppState;
use crate::db::models::Clip;
use crate::CoreError;

pub async fn list_clips_for_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Vec<Clip>>> {
    state
        .jobs
        .get_job(&job_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("job {job_id} not found")))?;

    let clips = state.clips.get_clips_by_job(&job_id).await?;
    Ok(Json(clips))
}

pub async fn get_clip_preview(State(state): State<AppState>, Path(clip_id): Path<String>) -> ApiResult<Json<ClipPreviewResponse>> {
    let clip = state
        .clips
        .get_clip(&clip_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("clip {clip_id} not found")))?;

    let metadata: Value = serde_json::from_str(&clip.metadata_json).unwrap_or(Value::Null);

    Ok(Json(ClipPreviewResponse {
        clip_id: clip.id,
        file_path: clip.file_path,
        thumbnail_path: clip.thumbnail_path,
        metadata,
    }))
}
