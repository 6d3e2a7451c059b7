//! `sqlx`-backed implementation of [`crate::controller::JobStore`].

use async_trait::async_trait;
use serde_json::json;

use crate::controller::JobStore;
use crate::db::repositories::{ClipRepository, JobRepository, JobStatusUpdate};
use crate::Result;

pub struct SqlJobStore {
    jobs: JobRepository,
    clips: ClipRepository,
}

impl SqlJobStore {
    pub fn new(jobs: JobRepository, clips: ClipRepository) -> Self {
        Self { jobs, clips }
    }

    async fn update(&self, job_id: &str, update: JobStatusUpdate<'_>) -> Result<()> {
        self.jobs.update_job_status(job_id, update).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqlJobStore {
    async fn start_run(&self, job_id: &str, progress_pct: u8, current_stage: &str, checkpoint_path: &str) -> Result<bool> {
        let existing = self.jobs.get_job(job_id).await?;
        if existing.is_none() {
            return Ok(false);
        }
        self.update(
            job_id,
            JobStatusUpdate {
                status: "running",
                current_stage: Some(current_stage),
                progress_pct: Some(progress_pct as i64),
                checkpoint_path: Some(checkpoint_path),
                ..Default::default()
            },
        )
        .await?;
        Ok(true)
    }

    async fn advance_stage(&self, job_id: &str, current_stage: &str, progress_pct: u8, checkpoint_path: &str) -> Result<()> {
        self.update(
            job_id,
            JobStatusUpdate {
                status: "running",
                current_stage: Some(current_stage),
                progress_pct: Some(progress_pct as i64),
                checkpoint_path: Some(checkpoint_path),
                ..Default::default()
            },
        )
        .await
    }

    async fn finalize_done(&self, job_id: &str) -> Result<()> {
        self.update(
            job_id,
            JobStatusUpdate { status: "done", current_stage: Some("completed"), progress_pct: Some(100), ..Default::default() },
        )
        .await
    }

    async fn mark_failed(&self, job_id: &str, progress_pct: u8, error_msg: &str, checkpoint_path: &str) -> Result<()> {
        self.update(
            job_id,
            JobStatusUpdate {
                status: "failed",
                current_stage: Some("failed"),
                progress_pct: Some(progress_pct as i64),
                error_msg: Some(error_msg),
                checkpoint_path: Some(checkpoint_path),
            },
        )
        .await
    }

    async fn mark_canceled(&self, job_id: &str, progress_pct: u8) -> Result<()> {
        self.update(
            job_id,
            JobStatusUpdate {
                status: "canceled",
                current_stage: Some("canceled"),
                progress_pct: Some(progress_pct as i64),
                ..Default::default()
            },
        )
        .await
    }

    async fn ensure_default_clip(&self, job_id: &str, file_path: &str, thumbnail_path: &str) -> Result<()> {
        let existing = self.clips.get_clips_by_job(job_id).await?;
        if !existing.is_empty() {
            return Ok(());
        }
        let clip_id = format!("{job_id}-clip-001");
        self.clips.create_clip(&clip_id, job_id, file_path, Some(thumbnail_path), "portrait", 0, 0, &json!({})).await?;
        Ok(())
    }

    async fn list_resumable_job_ids(&self) -> Result<Vec<String>> {
        let jobs = self.jobs.list_jobs_by_status(&["pending", "queued", "running"], 10_000).await?;
        Ok(jobs.into_iter().map(|job| job.id).collect())
    }

    async fn mark_queued_for_resume(&self, job_id: &str, checkpoint_path: &str) -> Result<()> {
        self.update(
            job_id,
            JobStatusUpdate { status: "queued", checkpoint_path: Some(checkpoint_path), ..Default::default() },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointStore;
    use crate::controller::{JobController, DEFAULT_STAGES};
    use crate::db::connection::DatabaseConnection;
    use crate::hub::ProgressHub;
    use crate::queue::QueueManager;
    use async_trait::async_trait;

    struct OkExecutor;

    #[async_trait]
    impl crate::controller::StageExecutor for OkExecutor {
        async fn execute(&self, _job_id: &str, _stage_name: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn full_run_against_sqlite_persists_terminal_status_and_default_clip() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        let jobs = JobRepository::new(conn.pool().clone());
        let clips = ClipRepository::new(conn.pool().clone());
        jobs.create_job("job-1", "/tmp/in.mp4", "local", None, None).await.unwrap();

        let store = SqlJobStore::new(jobs.clone(), clips.clone());
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointStore::new(dir.path());
        let queue = QueueManager::new(1);
        let hub = ProgressHub::new();
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

        let row = jobs.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(row.status, "done");
        assert_eq!(row.progress_pct, 100);
        assert_eq!(clips.get_clips_by_job("job-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn start_run_on_unknown_job_returns_false() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        let store = SqlJobStore::new(JobRepository::new(conn.pool().clone()), ClipRepository::new(conn.pool().clone()));

        assert!(!store.start_run("ghost", 5, "started", "/tmp/x.json").await.unwrap());
    }

    #[tokio::test]
    async fn list_resumable_job_ids_excludes_terminal_statuses() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        let jobs = JobRepository::new(conn.pool().clone());
        let clips = ClipRepository::new(conn.pool().clone());
        jobs.create_job("a", "/tmp/a.mp4", "local", None, None).await.unwrap();
        jobs.create_job("b", "/tmp/b.mp4", "local", None, None).await.unwrap();
        jobs.update_job_status("b", JobStatusUpdate { status: "done", progress_pct: Some(100), ..Default::default() }).await.unwrap();

        let store = SqlJobStore::new(jobs, clips);
        let resumable = store.list_resumable_job_ids().await.unwrap();
        assert_eq!(resumable, vec!["a".to_string()]);
    }
}
