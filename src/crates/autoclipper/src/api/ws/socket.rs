//! `/ws/{job_id}` progress subscription.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use chrono::Utc;
use serde_json::json;

use crate::api::routes::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(State(state): State<AppState>, Path(job_id): Path<String>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, job_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, job_id: String) {
    let snapshot = match state.jobs.get_job(&job_id).await {
        Ok(Some(job)) => json!({
            "job_id": job.id,
            "status": job.status,
            "progress_pct": job.progress_pct,
            "current_stage": job.current_stage,
            "timestamp": Utc::now().to_rfc3339(),
        }),
        Ok(None) => json!({
            "job_id": job_id,
            "status": "not_found",
            "progress_pct": 0,
            "current_stage": null,
            "timestamp": Utc::now().to_rfc3339(),
        }),
        Err(err) => {
            tracing::error!(%err, job_id, "ws: failed to load job snapshot");
            return;
        }
    };

    if socket.send(Message::Text(snapshot.to_string())).await.is_err() {
        return;
    }

    let mut events = state.hub.connect(&job_id).await;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(payload) => {
                        if socket.send(Message::Text(payload)).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => return,
                }
            }
            _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                let heartbeat = json!({
                    "job_id": job_id,
                    "status": "heartbeat",
                    "timestamp": Utc::now().to_rfc3339(),
                });
                if socket.send(Message::Text(heartbeat.to_string())).await.is_err() {
                    return;
                }
            }
        }
    }
}
