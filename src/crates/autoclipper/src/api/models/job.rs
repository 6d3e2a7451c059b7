//! Job request/response DTOs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub source_url: String,
    pub source_type: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub status: String,
    pub progress_pct: i64,
    pub current_stage: Option<String>,
    pub error_msg: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub id: String,
    pub accepted: bool,
}
