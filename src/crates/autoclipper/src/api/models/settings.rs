//! Settings and provider-secret request/response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub values: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdateRequest {
    pub values: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    pub provider: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
