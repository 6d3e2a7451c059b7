//! Clip response DTOs.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ClipPreviewResponse {
    pub clip_id: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub metadata: Value,
}
