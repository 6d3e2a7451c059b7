//! CORS middleware configuration
//!
//! The UI and the server are served from different origins in local
//! development (a Vite dev server fronting the sqlite-backed API), so CORS
//! is wide open rather than origin-restricted. Revisit before exposing this
//! behind anything but a trusted reverse proxy.

use tower_http::cors::CorsLayer;

/// Create the CORS layer applied to every route.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
