//! Job row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Valid values for [`Job::source_type`].
pub const VALID_SOURCE_TYPES: [&str; 2] = ["youtube", "local"];

/// Valid values for [`Job::status`].
pub const VALID_JOB_STATUSES: [&str; 6] = ["pending", "queued", "running", "done", "failed", "canceled"];

/// The durable unit of work tracked across the job lifecycle.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub user_id: Option<String>,
    pub source_url: String,
    pub source_type: String,
    pub status: String,
    pub progress_pct: i64,
    pub current_stage: Option<String>,
    pub error_msg: Option<String>,
    pub checkpoint_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// `true` once a job has left the queue/run lifecycle for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "done" | "canceled")
    }

    /// `true` if the job's status implies it should be re-queued on startup
    /// recovery (it was mid-flight when the service stopped).
    pub fn is_resumable(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "queued" | "running")
    }
}
