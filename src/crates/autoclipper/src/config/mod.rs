//! Flat JSON configuration store, backed by atomic file writes.
//!
//! Configuration is a single flat object of known keys; unknown keys are
//! rejected on write rather than silently accepted, and missing keys are
//! back-filled from [`default_config`] on first read so upgrades stay
//! forward compatible.

pub mod paths;
pub mod secrets;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{json, Value};

use crate::{CoreError, Result};

/// The full set of configuration keys this service understands, with their
/// defaults.
pub fn default_config() -> BTreeMap<String, Value> {
    [
        ("AI_MODE", json!("offline")),
        ("LLM_PROVIDER", json!("ollama")),
        ("OLLAMA_MODEL", json!("llama3.2:3b")),
        ("OPENROUTER_MODEL", json!("openrouter/auto")),
        ("WHISPER_MODEL", json!("small")),
        ("WHISPER_DEVICE", json!("auto")),
        ("MAX_CLIPS", json!(10)),
        ("MIN_VIRAL_SCORE", json!(60)),
        ("MAX_CONCURRENT_JOBS", json!(1)),
        ("GPU_ENABLED", json!("auto")),
        ("LAN_ENABLED", json!(false)),
        ("LAN_TOKEN", json!("")),
        ("FFMPEG_PRESET", json!("veryfast")),
        ("OUTPUT_FORMAT", json!("mp4")),
        ("APP_DATA_PATH", json!("")),
        ("LOG_LEVEL", json!("INFO")),
        ("AUTO_START", json!(false)),
        ("ENCRYPTED_OPENROUTER", json!("")),
        ("ENCRYPTED_OPENAI", json!("")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Reads, back-fills, and atomically rewrites the flat config JSON file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Creates the config file with defaults if absent; otherwise back-fills
    /// any default keys missing from the existing file.
    pub fn ensure_exists(&self, app_data_path: &str) -> Result<()> {
        if !self.config_path.exists() {
            let mut initial = default_config();
            initial.insert("APP_DATA_PATH".to_string(), json!(app_data_path));
            return self.write(&initial);
        }

        let mut current = self.load()?;
        let mut changed = false;
        for (key, value) in default_config() {
            if !current.contains_key(&key) {
                current.insert(key, value);
                changed = true;
            }
        }
        if current.get("APP_DATA_PATH").and_then(Value::as_str).unwrap_or_default().is_empty() {
            current.insert("APP_DATA_PATH".to_string(), json!(app_data_path));
            changed = true;
        }
        if changed {
            self.write(&current)?;
        }
        Ok(())
    }

    /// Reads the current config. The file is written atomically, so a
    /// reader never observes a partial write.
    pub fn load(&self) -> Result<BTreeMap<String, Value>> {
        let raw = std::fs::read_to_string(&self.config_path)?;
        serde_json::from_str(&raw).map_err(|e| CoreError::Internal(format!("failed reading config: {e}")))
    }

    /// Merges `updates` into the current config and persists the result.
    /// Fails with [`CoreError::InvalidInput`] if any key is not already
    /// present (i.e. not one of [`default_config`]'s keys).
    pub fn set_many(&self, updates: BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
        let mut current = self.load()?;
        if let Some(unknown) = updates.keys().find(|key| !current.contains_key(key.as_str())) {
            return Err(CoreError::InvalidInput(format!("unknown config key: {unknown}")));
        }
        current.extend(updates);
        self.write(&current)?;
        Ok(current)
    }

    /// Sets a single key, bypassing the unknown-key check — used for
    /// internal writes like `ENCRYPTED_<PROVIDER>` that are always valid.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut current = self.load()?;
        current.insert(key.to_string(), value);
        self.write(&current)
    }

    fn write(&self, data: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp_path = self.config_path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let body = serde_json::to_string_pretty(data)?;
        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, &self.config_path)?;
        Ok(())
    }
}
