//! /settings handlers.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::api::models::{ApiKeyRequest, MessageResponse, SettingsResponse, SettingsUpdateRequest};
use crate::api::routes::AppState;
use crate::config::secrets::config_key_for_provider;
use crate::CoreError;

const SUPPORTED_PROVIDERS: &[&str] = &["openrouter", "openai"];

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsResponse>> {
    let values = state.config.load()?;
    Ok(Json(SettingsResponse { values }))
}

pub async fn put_settings(State(state): State<AppState>, Json(req): Json<SettingsUpdateRequest>) -> ApiResult<Json<SettingsResponse>> {
    let values = state.config.set_many(req.values)?;
    Ok(Json(SettingsResponse { values }))
}

pub async fn post_api_key(State(state): State<AppState>, Json(req): Json<ApiKeyRequest>) -> ApiResult<Json<MessageResponse>> {
    if !SUPPORTED_PROVIDERS.contains(&req.provider.as_str()) {
        return Err(CoreError::InvalidInput(format!("unknown provider: {}", req.provider)).into());
    }

    let encrypted = state.secrets.encrypt(&req.api_key)?;
    state.config.set(&config_key_for_provider(&req.provider), Value::String(encrypted))?;

    Ok(Json(MessageResponse { message: format!("{} api key saved", req.provider) }))
}
