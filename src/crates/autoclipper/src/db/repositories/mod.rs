//! Repository pattern implementations for database access
//!
//! This module provides repository structs for managing database operations
//! on the job orchestration core's three persisted entities: jobs, clips,
//! and settings.

pub mod clip_repo;
pub mod job_repo;
pub mod setting_repo;

pub use clip_repo::ClipRepository;
pub use job_repo::{JobRepository, JobStatusUpdate};
pub use setting_repo::SettingRepository;
