//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::config::secrets::SecretBox;
use crate::config::ConfigStore;
use crate::db::{ClipRepository, DatabaseConnection, JobRepository};
use crate::hub::ProgressHub;
use crate::queue::QueueManager;

use super::{handlers, ws};

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jobs: JobRepository,
    pub clips: ClipRepository,
    pub config: ConfigStore,
    pub secrets: Arc<SecretBox>,
    pub queue: QueueManager,
    pub hub: ProgressHub,
}

/// Build the complete API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/jobs", post(handlers::jobs::create_job).get(handlers::jobs::list_jobs))
        .route("/jobs/:job_id", get(handlers::jobs::get_job))
        .route("/jobs/:job_id/status", get(handlers::jobs::get_job_status))
        .route("/jobs/:job_id/cancel", post(handlers::jobs::cancel_job))
        .route("/jobs/:job_id/reorder", post(handlers::jobs::reorder_job))
        .route("/clips/:job_id", get(handlers::clips::list_clips_for_job))
        .route("/clips/:clip_id/preview", get(handlers::clips::get_clip_preview))
        .route("/settings", get(handlers::settings::get_settings).put(handlers::settings::put_settings))
        .route("/settings/api-key", post(handlers::settings::post_api_key))
        .route("/ws/:job_id", get(ws::ws_handler))
        .layer(super::middleware::logging_layer())
        .layer(super::middleware::cors_layer())
        .with_state(state)
}
