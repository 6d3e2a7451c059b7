//! Atomic per-job checkpoint persistence.
//!
//! A checkpoint is the smallest durable record needed to resume a job
//! without redoing completed stages. Writes go to a sibling `.tmp` path and
//! are then renamed over the target so a concurrent reader never observes a
//! partial file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk checkpoint payload, `{job_id, status, current_stage, progress_pct, updated_at}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub job_id: String,
    pub status: String,
    pub current_stage: String,
    pub progress_pct: u8,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Keeps checkpoint files under a root directory, one subdirectory per job id.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

/// Replace anything that isn't alphanumeric, `-`, or `_` so a job id can
/// never be used to escape the checkpoint root.
fn sanitize_job_id(job_id: &str) -> String {
    job_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pure: the canonical checkpoint path for a job id, no I/O performed.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.root.join(sanitize_job_id(job_id)).join("checkpoint.json")
    }

    /// Write `record` atomically, creating the parent directory if needed.
    /// Returns the canonical path on success.
    pub fn save(&self, job_id: &str, record: &CheckpointRecord) -> std::io::Result<PathBuf> {
        let path = self.path_for(job_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = tmp_sibling(&path);
        let payload = serde_json::to_vec_pretty(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// Returns the parsed record, or `None` if the file is absent or
    /// unparsable. A corrupted checkpoint is treated as missing; no error
    /// ever escapes this call.
    pub fn load(&self, job_id: &str) -> Option<CheckpointRecord> {
        let path = self.path_for(job_id);
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Removes the checkpoint if present; succeeds even if it was already
    /// absent.
    pub fn delete(&self, job_id: &str) -> std::io::Result<()> {
        let path = self.path_for(job_id);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
