//! Database module
//!
//! Provides database connectivity, models, repositories, and error handling
//! for persistent storage of jobs, clips, and settings.

pub mod connection;
pub mod error;
pub mod job_store;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use job_store::SqlJobStore;
pub use models::{Clip, Job, Setting};
pub use repositories::{ClipRepository, JobRepository, JobStatusUpdate, SettingRepository};
