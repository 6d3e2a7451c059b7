//! Database models
//!
//! Core data models for persistent storage of jobs, clips, and settings.
//! Timestamp columns are stored as ISO8601 strings (TEXT in SQLite); `sqlx`'s
//! chrono feature handles the conversion transparently via `FromRow`.

pub mod clip;
pub mod job;
pub mod setting;

pub use clip::{Clip, VALID_CLIP_MODES};
pub use job::{Job, VALID_JOB_STATUSES, VALID_SOURCE_TYPES};
pub use setting::Setting;
