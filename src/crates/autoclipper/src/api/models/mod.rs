//! API request/response DTOs.
//!
//! Durable entities (`Job`, `Clip`) are returned as-is from [`crate::db::models`];
//! this module holds the request bodies and response shapes that don't map
//! 1:1 onto a database row.

pub mod clip;
pub mod job;
pub mod settings;

pub use clip::ClipPreviewResponse;
pub use job::{CancelResponse, CreateJobRequest, JobStatusResponse, ListJobsQuery, ReorderRequest, ReorderResponse};
pub use settings::{ApiKeyRequest, MessageResponse, SettingsResponse, SettingsUpdateRequest};

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
