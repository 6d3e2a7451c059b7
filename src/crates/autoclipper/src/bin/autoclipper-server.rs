//! Autoclipper server binary.
//!
//! Wires the orchestration core (queue, controller, checkpoint store,
//! progress hub) to a sqlite-backed job store and serves the HTTP/WebSocket
//! API over it.

use std::sync::Arc;

use async_trait::async_trait;
use autoclipper_core::api::routes::{create_router, AppState};
use autoclipper_core::checkpoint::CheckpointStore;
use autoclipper_core::config::paths::ensure_runtime_paths;
use autoclipper_core::config::secrets::SecretBox;
use autoclipper_core::config::ConfigStore;
use autoclipper_core::controller::{recover_jobs, JobController, StageExecutor, DEFAULT_STAGES};
use autoclipper_core::db::{ClipRepository, DatabaseConnection, JobRepository, SqlJobStore};
use autoclipper_core::hub::ProgressHub;
use autoclipper_core::queue::QueueManager;
use autoclipper_core::Result;

/// Drives the three declared stages for one job run. Ingest, transcribe, and
/// render all depend on collaborators (downloader, ASR provider, ffmpeg
/// command runner) that sit outside this crate's module boundary; wiring
/// them is deployment-specific integration work, not orchestration logic, so
/// this executor only advances the state machine.
struct PipelineStageExecutor;

#[async_trait]
impl StageExecutor for PipelineStageExecutor {
    async fn execute(&self, job_id: &str, stage_name: &str) -> Result<()> {
        tracing::info!(job_id, stage_name, "stage executed (collaborator not wired in this build)");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let cwd = std::env::current_dir()?;
    let paths = ensure_runtime_paths(&cwd)?;
    tracing::info!(root = %paths.root.display(), "runtime paths resolved");

    let config = ConfigStore::new(paths.config_path.clone());
    config.ensure_exists(&paths.root.to_string_lossy())?;

    let database_url = format!("sqlite://{}?mode=rwc", paths.database_path.display());
    let db = DatabaseConnection::new(&database_url).await?;
    db.run_migrations().await?;

    let secrets = Arc::new(SecretBox::load_or_create(&paths.secrets_dir.join("fernet.key"))?);

    let jobs = JobRepository::new(db.pool().clone());
    let clips = ClipRepository::new(db.pool().clone());
    let checkpoint = Arc::new(CheckpointStore::new(paths.downloads_dir.clone()));
    let hub = ProgressHub::new();

    let configured = config.load()?;
    let max_concurrent = configured.get("MAX_CONCURRENT_JOBS").and_then(|v| v.as_u64()).unwrap_or(1).max(1) as usize;
    let queue = QueueManager::new(max_concurrent);

    let job_store = Arc::new(SqlJobStore::new(jobs.clone(), clips.clone()));
    let executor = Arc::new(PipelineStageExecutor);

    {
        let checkpoint = checkpoint.clone();
        let hub = hub.clone();
        let queue_for_controller = queue.clone();
        let job_store = job_store.clone();
        let executor = executor.clone();
        queue
            .set_processor(move |job_id| {
                let checkpoint = checkpoint.clone();
                let hub = hub.clone();
                let queue = queue_for_controller.clone();
                let job_store = job_store.clone();
                let executor = executor.clone();
                async move {
                    let controller = JobController {
                        checkpoint: checkpoint.as_ref(),
                        queue: &queue,
                        hub: &hub,
                        store: job_store.as_ref(),
                        executor: executor.as_ref(),
                        stages: &DEFAULT_STAGES,
                    };
                    if let Err(err) = controller.run(&job_id).await {
                        tracing::warn!(job_id, %err, "job run ended in error");
                    }
                }
            })
            .await;
    }

    let recovered = recover_jobs(job_store.as_ref(), checkpoint.as_ref(), &queue).await?;
    tracing::info!(recovered, "resumable jobs re-enqueued on startup");

    queue.start().await;

    let state = AppState { db: db.clone(), jobs, clips, config, secrets, queue: queue.clone(), hub };
    let app = create_router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse::<u16>().expect("PORT must be a valid u16");
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let addr: std::net::SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!(%addr, "starting autoclipper server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;

    queue.stop().await;
    db.close().await;
    tracing::info!("autoclipper server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
