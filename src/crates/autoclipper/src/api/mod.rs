//! HTTP + WebSocket API surface for job orchestration.
//!
//! Provides endpoints for job lifecycle management, clip retrieval,
//! settings, and a per-job progress subscription over WebSocket.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod ws;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
