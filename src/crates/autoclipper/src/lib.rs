//! Job orchestration core for the automated short-form clip generator.
//!
//! This crate owns the parts of the system that are genuinely hard to get
//! right: the job lifecycle state machine, the bounded concurrent queue, the
//! checkpoint store, the progress fan-out hub, and the deterministic media
//! decision algorithms (face segmentation, hook scoring). Media download,
//! transcription, and LLM provider calls are external collaborators reached
//! through narrow interfaces rather than implemented here.

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod db;
pub mod hooks;
pub mod hub;
pub mod input;
pub mod queue;
pub mod renderer;
pub mod segmenter;
pub mod subtitles;

use thiserror::Error;

/// Errors surfaced by the orchestration core.
///
/// Variant names track the error-kind vocabulary from the external
/// interface contract so HTTP handlers and job status rows can report a
/// stable set of identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation failure in the input normalizer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown job or clip id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Enqueue of an id already pending or running.
    #[error("conflict: {0}")]
    Conflict(String),

    /// External render tool exited non-zero.
    #[error("render failed: {0}")]
    RenderFailed(String),

    /// Transcription stage failed.
    #[error("transcribe failed: {0}")]
    TranscribeFailed(String),

    /// Ingest stage failed.
    #[error("ingest failed: {0}")]
    IngestFailed(String),

    /// An LLM provider is disabled or unreachable; callers may fall back
    /// rather than fail the job.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<db::error::DatabaseError> for CoreError {
    fn from(err: db::error::DatabaseError) -> Self {
        match err {
            db::error::DatabaseError::NotFound(msg) => CoreError::NotFound(msg),
            db::error::DatabaseError::ConstraintViolation(msg) => CoreError::InvalidInput(msg),
            other => CoreError::Internal(other.to_string()),
        }
    }
}
