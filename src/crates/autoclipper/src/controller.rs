//! Job lifecycle state machine: one run of one job id from its last
//! checkpointed stage to a terminal outcome, plus startup recovery.
//!
//! The controller owns sequencing only. Stage work itself (ingest,
//! transcribe, render) is delegated to a [`StageExecutor`] the caller
//! supplies; durable persistence is delegated to a [`JobStore`]. Both are
//! narrow interfaces so the state machine can be exercised without a real
//! database or media pipeline.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::hub::ProgressHub;
use crate::queue::QueueManager;
use crate::{CoreError, Result};

/// One declared pipeline stage and the progress percentage it completes at.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub name: &'static str,
    pub target_progress_pct: u8,
}

/// The default three-stage pipeline: ingest, transcribe, render.
pub const DEFAULT_STAGES: [StageSpec; 3] = [
    StageSpec { name: "ingest", target_progress_pct: 20 },
    StageSpec { name: "transcribe", target_progress_pct: 55 },
    StageSpec { name: "render", target_progress_pct: 100 },
];

/// Event shape published to the progress hub for every transition.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub status: String,
    pub progress_pct: u8,
    pub current_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

impl ProgressEvent {
    fn new(job_id: &str, status: &str, progress_pct: u8, current_stage: Option<&str>, message: Option<&str>) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: status.to_string(),
            progress_pct,
            current_stage: current_stage.map(str::to_string),
            message: message.map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

/// Durable persistence the controller needs, one method per transition so a
/// concrete `sqlx` repository can map each directly onto one `UPDATE`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Transitions a job into `running` at the start of a run. Returns
    /// `false` if the job id no longer exists (the run is abandoned).
    async fn start_run(&self, job_id: &str, progress_pct: u8, current_stage: &str, checkpoint_path: &str) -> Result<bool>;

    /// Records entry into a new stage.
    async fn advance_stage(&self, job_id: &str, current_stage: &str, progress_pct: u8, checkpoint_path: &str) -> Result<()>;

    /// Marks the job `done`, `progress=100`, clears `error_msg`.
    async fn finalize_done(&self, job_id: &str) -> Result<()>;

    /// Marks the job `failed`, retaining its checkpoint.
    async fn mark_failed(&self, job_id: &str, progress_pct: u8, error_msg: &str, checkpoint_path: &str) -> Result<()>;

    /// Marks the job `canceled`.
    async fn mark_canceled(&self, job_id: &str, progress_pct: u8) -> Result<()>;

    /// Ensures at least one clip row exists for the job, creating a minimal
    /// placeholder at `(file_path, thumbnail_path)` if none exist.
    async fn ensure_default_clip(&self, job_id: &str, file_path: &str, thumbnail_path: &str) -> Result<()>;

    /// All job ids currently `pending`, `queued`, or `running`.
    async fn list_resumable_job_ids(&self) -> Result<Vec<String>>;

    /// Resets a job to `queued`, preserving its `current_stage`/`progress_pct`.
    async fn mark_queued_for_resume(&self, job_id: &str, checkpoint_path: &str) -> Result<()>;
}

/// Delegate that performs one stage's actual work (download, transcribe,
/// render, ...). The controller never interprets failures beyond "stage
/// work returned an error".
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, job_id: &str, stage_name: &str) -> Result<()>;
}

/// Drives one job through [`DEFAULT_STAGES`] (or a caller-supplied stage
/// list) from its last checkpoint to a terminal state.
pub struct JobController<'a> {
    pub checkpoint: &'a CheckpointStore,
    pub queue: &'a QueueManager,
    pub hub: &'a ProgressHub,
    pub store: &'a dyn JobStore,
    pub executor: &'a dyn StageExecutor,
    pub stages: &'a [StageSpec],
}

/// Computes the index of the first stage to execute given the last
/// persisted stage name and progress.
fn resolve_start_index(stages: &[StageSpec], checkpoint_stage: &str, checkpoint_progress: u8) -> usize {
    let Some(index) = stages.iter().position(|s| s.name == checkpoint_stage) else {
        return 0;
    };
    let start = if checkpoint_progress >= stages[index].target_progress_pct { index + 1 } else { index };
    start.min(stages.len().saturating_sub(1))
}

impl<'a> JobController<'a> {
    async fn publish(&self, job_id: &str, status: &str, progress_pct: u8, current_stage: Option<&str>, message: Option<&str>) {
        let event = ProgressEvent::new(job_id, status, progress_pct, current_stage, message);
        self.hub.publish(job_id, &event).await;
    }

    async fn mark_canceled(&self, job_id: &str, progress_pct: u8) -> Result<()> {
        // The checkpoint is retained so a future requeue of the same id can
        // still resume; only the DB row and an outgoing event record the
        // cancellation.
        self.store.mark_canceled(job_id, progress_pct).await?;
        self.publish(job_id, "canceled", progress_pct, Some("canceled"), Some("job canceled")).await;
        Ok(())
    }

    /// Runs one job id to completion, failure, or cancellation.
    pub async fn run(&self, job_id: &str) -> Result<()> {
        let checkpoint_path = self.checkpoint.path_for(job_id);
        let checkpoint_path_str = checkpoint_path.to_string_lossy().into_owned();
        let checkpoint = self.checkpoint.load(job_id);
        let mut last_progress = checkpoint.as_ref().map(|c| c.progress_pct).unwrap_or(0);
        let checkpoint_stage = checkpoint.as_ref().map(|c| c.current_stage.as_str()).unwrap_or("").to_string();

        let initial_progress = last_progress.max(5);
        let entered = self
            .store
            .start_run(job_id, initial_progress, "started", &checkpoint_path_str)
            .await?;
        if !entered {
            return Ok(());
        }
        self.publish(job_id, "running", initial_progress, Some("started"), Some("job started")).await;

        let start_index = resolve_start_index(self.stages, &checkpoint_stage, last_progress);
        if start_index > 0 {
            let stage_label = if checkpoint_stage.is_empty() { "resume" } else { checkpoint_stage.as_str() };
            self.publish(job_id, "running", last_progress, Some(stage_label), Some("resuming from checkpoint")).await;
        }

        let run_result = self.run_stages(job_id, &checkpoint_path_str, start_index, &mut last_progress).await;

        match run_result {
            Ok(RunOutcome::Completed) => {
                self.finalize(job_id).await?;
                Ok(())
            }
            Ok(RunOutcome::Canceled) => self.mark_canceled(job_id, last_progress).await,
            Err(err) => {
                self.store.mark_failed(job_id, last_progress, &err.to_string(), &checkpoint_path_str).await?;
                self.publish(job_id, "failed", last_progress, Some("failed"), Some(&err.to_string())).await;
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        job_id: &str,
        checkpoint_path_str: &str,
        start_index: usize,
        last_progress: &mut u8,
    ) -> Result<RunOutcome> {
        for stage in &self.stages[start_index..] {
            if self.queue.is_cancel_requested(job_id).await {
                return Ok(RunOutcome::Canceled);
            }

            let record = CheckpointRecord {
                job_id: job_id.to_string(),
                status: "running".to_string(),
                current_stage: stage.name.to_string(),
                progress_pct: stage.target_progress_pct,
                updated_at: Utc::now(),
            };
            self.checkpoint.save(job_id, &record)?;
            self.store
                .advance_stage(job_id, stage.name, stage.target_progress_pct, checkpoint_path_str)
                .await?;
            self.publish(job_id, "running", stage.target_progress_pct, Some(stage.name), None).await;

            self.executor.execute(job_id, stage.name).await?;
            *last_progress = stage.target_progress_pct;
        }
        Ok(RunOutcome::Completed)
    }

    async fn finalize(&self, job_id: &str) -> Result<()> {
        let default_clip_path = format!("{job_id}_clip_001.mp4");
        let default_thumbnail_path = format!("{job_id}_clip_001.jpg");
        self.store.ensure_default_clip(job_id, &default_clip_path, &default_thumbnail_path).await?;
        self.store.finalize_done(job_id).await?;
        self.checkpoint.delete(job_id)?;
        self.publish(job_id, "done", 100, Some("completed"), Some("job completed")).await;
        Ok(())
    }
}

enum RunOutcome {
    Completed,
    Canceled,
}

/// Requeues every `pending`/`queued`/`running` job on startup, preserving
/// stage and progress. Returns the count successfully re-enqueued.
pub async fn recover_jobs(store: &dyn JobStore, checkpoint: &CheckpointStore, queue: &QueueManager) -> Result<usize> {
    let job_ids = store.list_resumable_job_ids().await?;
    let mut recovered = 0;
    for job_id in &job_ids {
        let checkpoint_path = checkpoint.path_for(job_id).to_string_lossy().into_owned();
        store.mark_queued_for_resume(job_id, &checkpoint_path).await?;
        if queue.enqueue(job_id).await {
            recovered += 1;
        }
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Default)]
    struct JobRow {
        status: String,
        current_stage: String,
        progress_pct: u8,
        error_msg: Option<String>,
    }

    #[derive(Default)]
    struct FakeJobStore {
        rows: Mutex<HashMap<String, JobRow>>,
        clips: Mutex<HashMap<String, String>>,
        known: Mutex<bool>,
    }

    impl FakeJobStore {
        fn seed(job_id: &str, status: &str, stage: &str, progress: u8) -> Self {
            let mut rows = HashMap::new();
            rows.insert(
                job_id.to_string(),
                JobRow { status: status.to_string(), current_stage: stage.to_string(), progress_pct: progress, error_msg: None },
            );
            Self { rows: Mutex::new(rows), clips: Mutex::new(HashMap::new()), known: Mutex::new(true) }
        }

        fn row(&self, job_id: &str) -> JobRow {
            self.rows.lock().unwrap().get(job_id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl JobStore for FakeJobStore {
        async fn start_run(&self, job_id: &str, progress_pct: u8, current_stage: &str, _checkpoint_path: &str) -> Result<bool> {
            if !*self.known.lock().unwrap() {
                return Ok(false);
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows.entry(job_id.to_string()).or_default();
            row.status = "running".to_string();
            row.current_stage = current_stage.to_string();
            row.progress_pct = progress_pct;
            Ok(true)
        }

        async fn advance_stage(&self, job_id: &str, current_stage: &str, progress_pct: u8, _checkpoint_path: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.entry(job_id.to_string()).or_default();
            row.current_stage = current_stage.to_string();
            row.progress_pct = progress_pct;
            Ok(())
        }

        async fn finalize_done(&self, job_id: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.entry(job_id.to_string()).or_default();
            row.status = "done".to_string();
            row.current_stage = "completed".to_string();
            row.progress_pct = 100;
            row.error_msg = None;
            Ok(())
        }

        async fn mark_failed(&self, job_id: &str, progress_pct: u8, error_msg: &str, _checkpoint_path: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.entry(job_id.to_string()).or_default();
            row.status = "failed".to_string();
            row.current_stage = "failed".to_string();
            row.progress_pct = progress_pct;
            row.error_msg = Some(error_msg.to_string());
            Ok(())
        }

        async fn mark_canceled(&self, job_id: &str, progress_pct: u8) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.entry(job_id.to_string()).or_default();
            row.status = "canceled".to_string();
            row.current_stage = "canceled".to_string();
            row.progress_pct = progress_pct;
            Ok(())
        }

        async fn ensure_default_clip(&self, job_id: &str, file_path: &str, _thumbnail_path: &str) -> Result<()> {
            self.clips.lock().unwrap().entry(job_id.to_string()).or_insert_with(|| file_path.to_string());
            Ok(())
        }

        async fn list_resumable_job_ids(&self) -> Result<Vec<String>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, row)| matches!(row.status.as_str(), "pending" | "queued" | "running"))
                .map(|(id, _)| id.clone())
                .collect())
        }

        async fn mark_queued_for_resume(&self, job_id: &str, _checkpoint_path: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.get_mut(job_id) {
                row.status = "queued".to_string();
            }
            Ok(())
        }
    }

    struct OkExecutor;

    #[async_trait]
    impl StageExecutor for OkExecutor {
        async fn execute(&self, _job_id: &str, _stage_name: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FailingExecutor {
        fail_at_stage: &'static str,
    }

    #[async_trait]
    impl StageExecutor for FailingExecutor {
        async fn execute(&self, _job_id: &str, stage_name: &str) -> Result<()> {
            if stage_name == self.fail_at_stage {
                Err(CoreError::TranscribeFailed("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn harness(store: &FakeJobStore) -> (CheckpointStore, QueueManager, ProgressHub, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointStore::new(dir.path());
        let queue = QueueManager::new(1);
        let hub = ProgressHub::new();
        let _ = store;
        (checkpoint, queue, hub, dir)
    }

    #[tokio::test]
    async fn fresh_job_runs_all_stages_and_finalizes() {
        let store = FakeJobStore::seed("job-1", "queued", "", 0);
        let (checkpoint, queue, hub, _dir) = harness(&store);
        let executor = OkExecutor;
        let controller = JobController {
            checkpoint: &checkpoint,
            queue: &queue,
            hub: &hub,
            store: &store,
            executor: &executor,
            stages: &DEFAULT_STAGES,
        };

        controller.run("job-1").await.unwrap();

        let row = store.row("job-1");
        assert_eq!(row.status, "done");
        assert_eq!(row.progress_pct, 100);
        assert!(checkpoint.load("job-1").is_none());
        assert!(store.clips.lock().unwrap().contains_key("job-1"));
    }

    #[tokio::test]
    async fn resume_skips_completed_stage() {
        let store = FakeJobStore::seed("job-1", "queued", "ingest", 20);
        let (checkpoint, queue, hub, _dir) = harness(&store);
        checkpoint
            .save(
                "job-1",
                &CheckpointRecord {
                    job_id: "job-1".into(),
                    status: "running".into(),
                    current_stage: "ingest".into(),
                    progress_pct: 20,
                    updated_at: Utc::now(),
                },
            )
            .unwrap();

        struct RecordingExecutor {
            seen: Mutex<Vec<String>>,
        }
        #[async_trait]
        impl StageExecutor for RecordingExecutor {
            async fn execute(&self, _job_id: &str, stage_name: &str) -> Result<()> {
                self.seen.lock().unwrap().push(stage_name.to_string());
                Ok(())
            }
        }
        let executor = RecordingExecutor { seen: Mutex::new(Vec::new()) };

        let controller = JobController {
            checkpoint: &checkpoint,
            queue: &queue,
            hub: &hub,
            store: &store,
            executor: &executor,
            stages: &DEFAULT_STAGES,
        };
        controller.run("job-1").await.unwrap();

        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["transcribe", "render"]);
    }

    #[tokio::test]
    async fn resume_reexecutes_stage_whose_progress_was_not_reached() {
        let index = resolve_start_index(&DEFAULT_STAGES, "transcribe", 30);
        assert_eq!(DEFAULT_STAGES[index].name, "transcribe");
    }

    #[tokio::test]
    async fn unknown_checkpoint_stage_starts_from_zero() {
        assert_eq!(resolve_start_index(&DEFAULT_STAGES, "", 0), 0);
        assert_eq!(resolve_start_index(&DEFAULT_STAGES, "nonexistent", 50), 0);
    }

    #[tokio::test]
    async fn missing_job_row_aborts_run_without_error() {
        let store = FakeJobStore::default();
        *store.known.lock().unwrap() = false;
        let (checkpoint, queue, hub, _dir) = harness(&store);
        let executor = OkExecutor;
        let controller = JobController {
            checkpoint: &checkpoint,
            queue: &queue,
            hub: &hub,
            store: &store,
            executor: &executor,
            stages: &DEFAULT_STAGES,
        };

        controller.run("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn cancel_observed_at_first_stage_boundary_marks_canceled_and_keeps_checkpoint() {
        let store = std::sync::Arc::new(FakeJobStore::seed("job-1", "queued", "", 0));
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = std::sync::Arc::new(CheckpointStore::new(dir.path()));
        let hub = std::sync::Arc::new(ProgressHub::new());
        let queue = QueueManager::new(1);

        // The processor cancels its own job id the instant the worker loop
        // has promoted it into `running`, so the controller observes
        // cancellation at the very first stage boundary.
        let store_cl = store.clone();
        let checkpoint_cl = checkpoint.clone();
        let hub_cl = hub.clone();
        let queue_cl = queue.clone();
        queue
            .set_processor(move |job_id| {
                let store = store_cl.clone();
                let checkpoint = checkpoint_cl.clone();
                let hub = hub_cl.clone();
                let queue = queue_cl.clone();
                async move {
                    queue.cancel(&job_id).await;
                    let executor = OkExecutor;
                    let controller = JobController {
                        checkpoint: &checkpoint,
                        queue: &queue,
                        hub: &hub,
                        store: store.as_ref(),
                        executor: &executor,
                        stages: &DEFAULT_STAGES,
                    };
                    let _ = controller.run(&job_id).await;
                }
            })
            .await;

        queue.start().await;
        queue.enqueue("job-1").await;
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        queue.stop().await;

        let row = store.row("job-1");
        assert_eq!(row.status, "canceled");
        assert!(checkpoint.load("job-1").is_none(), "no stage ever checkpointed before cancellation");
    }

    #[tokio::test]
    async fn failing_stage_marks_failed_and_retains_checkpoint() {
        let store = FakeJobStore::seed("job-1", "queued", "", 0);
        let (checkpoint, queue, hub, _dir) = harness(&store);
        let executor = FailingExecutor { fail_at_stage: "transcribe" };
        let controller = JobController {
            checkpoint: &checkpoint,
            queue: &queue,
            hub: &hub,
            store: &store,
            executor: &executor,
            stages: &DEFAULT_STAGES,
        };

        let err = controller.run("job-1").await.unwrap_err();
        assert!(matches!(err, CoreError::TranscribeFailed(_)));

        let row = store.row("job-1");
        assert_eq!(row.status, "failed");
        assert_eq!(row.progress_pct, 20);
        assert!(checkpoint.load("job-1").is_some());
    }

    #[tokio::test]
    async fn recover_jobs_requeues_resumable_ids_and_skips_terminal_ones() {
        let store = FakeJobStore::seed("job-1", "running", "ingest", 20);
        store.rows.lock().unwrap().insert(
            "job-2".to_string(),
            JobRow { status: "done".to_string(), current_stage: "completed".to_string(), progress_pct: 100, error_msg: None },
        );
        let (checkpoint, queue, _hub, _dir) = harness(&store);

        let recovered = recover_jobs(&store, &checkpoint, &queue).await.unwrap();
        assert_eq!(recovered, 1);

        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.pending, vec!["job-1"]);
        assert_eq!(store.row("job-1").status, "queued");
    }
}
