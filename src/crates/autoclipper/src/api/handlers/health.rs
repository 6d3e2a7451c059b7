//! GET /health

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiResult;
use crate::api::models::HealthResponse;
use crate::api::routes::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.db.health_check().await?;
    Ok(Json(HealthResponse { status: "ok", service: "autoclipper" }))
}
