//! Clip row, created on a job's successful completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Valid values for [`Clip::mode`].
pub const VALID_CLIP_MODES: [&str; 2] = ["portrait", "landscape"];

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub job_id: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub mode: String,
    pub viral_score: i64,
    pub duration_sec: i64,
    pub metadata_json: String,
    pub created_at: DateTime<Utc>,
}
