//! Request logging middleware
//!
//! Spans every `/jobs`, `/clips`, and `/ws` request at INFO so job creation
//! and WebSocket upgrades show up in server logs without per-handler
//! `tracing::info!` calls.

use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnResponse};
use tracing::Level;

/// Create the request logging layer applied to every route.
pub fn logging_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(
            DefaultMakeSpan::new()
                .level(Level::INFO)
        )
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .include_headers(false)
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_layer_creation() {
        let _layer = logging_layer();
    }
}
