//! Repository for `jobs` rows.

use chrono::Utc;

use crate::db::connection::DatabasePool;
use crate::db::error::{DatabaseError, DbResult};
use crate::db::models::{Job, VALID_JOB_STATUSES, VALID_SOURCE_TYPES};

#[derive(Clone)]
pub struct JobRepository {
    pool: DatabasePool,
}

/// Fields that may change on a status transition. `None` leaves the column
/// untouched.
#[derive(Debug, Default)]
pub struct JobStatusUpdate<'a> {
    pub status: &'a str,
    pub current_stage: Option<&'a str>,
    pub progress_pct: Option<i64>,
    pub error_msg: Option<&'a str>,
    pub checkpoint_path: Option<&'a str>,
}

impl JobRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub async fn create_job(
        &self,
        job_id: &str,
        source_url: &str,
        source_type: &str,
        user_id: Option<&str>,
        checkpoint_path: Option<&str>,
    ) -> DbResult<Job> {
        if !VALID_SOURCE_TYPES.contains(&source_type) {
            return Err(DatabaseError::constraint(format!("invalid source_type: {source_type}")));
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO jobs (id, user_id, source_url, source_type, status, progress_pct, current_stage, checkpoint_path, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'pending', 0, 'created', ?, ?, ?)",
        )
        .bind(job_id)
        .bind(user_id)
        .bind(source_url)
        .bind(source_type)
        .bind(checkpoint_path)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_job(job_id).await?.ok_or_else(|| DatabaseError::not_found(job_id))
    }

    pub async fn get_job(&self, job_id: &str) -> DbResult<Option<Job>> {
        let row = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_jobs(&self, limit: i64, offset: i64) -> DbResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY updated_at DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_jobs_by_status(&self, statuses: &[&str], limit: i64) -> DbResult<Vec<Job>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT * FROM jobs WHERE status IN ({placeholders}) ORDER BY updated_at ASC LIMIT ?");

        let mut query = sqlx::query_as::<_, Job>(&sql);
        for status in statuses {
            query = query.bind(*status);
        }
        query = query.bind(limit);

        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn update_job_status(&self, job_id: &str, update: JobStatusUpdate<'_>) -> DbResult<Option<Job>> {
        if !VALID_JOB_STATUSES.contains(&update.status) {
            return Err(DatabaseError::constraint(format!("invalid status: {}", update.status)));
        }
        if self.get_job(job_id).await?.is_none() {
            return Ok(None);
        }

        let progress_pct = update.progress_pct.map(|pct| pct.clamp(0, 100));
        sqlx::query(
            "UPDATE jobs SET
                status = ?,
                current_stage = COALESCE(?, current_stage),
                progress_pct = COALESCE(?, progress_pct),
                error_msg = COALESCE(?, error_msg),
                checkpoint_path = COALESCE(?, checkpoint_path),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(update.status)
        .bind(update.current_stage)
        .bind(progress_pct)
        .bind(update.error_msg)
        .bind(update.checkpoint_path)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        self.get_job(job_id).await
    }

    pub async fn delete_job(&self, job_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?").bind(job_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;

    async fn setup() -> (DatabaseConnection, JobRepository) {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        let repo = JobRepository::new(conn.pool().clone());
        (conn, repo)
    }

    #[tokio::test]
    async fn create_job_rejects_unknown_source_type() {
        let (_conn, repo) = setup().await;
        let err = repo.create_job("job-1", "https://example.com", "carrier-pigeon", None, None).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn create_and_fetch_job_round_trips() {
        let (_conn, repo) = setup().await;
        let job = repo.create_job("job-1", "https://youtu.be/abc123def45", "youtube", None, None).await.unwrap();
        assert_eq!(job.status, "pending");
        assert_eq!(job.progress_pct, 0);

        let fetched = repo.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(fetched.source_url, "https://youtu.be/abc123def45");
    }

    #[tokio::test]
    async fn update_job_status_clamps_progress_and_advances_updated_at() {
        let (_conn, repo) = setup().await;
        repo.create_job("job-1", "/tmp/in.mp4", "local", None, None).await.unwrap();

        let updated = repo
            .update_job_status(
                "job-1",
                JobStatusUpdate { status: "running", progress_pct: Some(150), current_stage: Some("transcribe"), ..Default::default() },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, "running");
        assert_eq!(updated.progress_pct, 100);
        assert_eq!(updated.current_stage.as_deref(), Some("transcribe"));
    }

    #[tokio::test]
    async fn update_job_status_on_unknown_id_returns_none() {
        let (_conn, repo) = setup().await;
        let result = repo.update_job_status("missing", JobStatusUpdate { status: "running", ..Default::default() }).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_jobs_by_status_filters_and_orders_ascending() {
        let (_conn, repo) = setup().await;
        repo.create_job("a", "/tmp/a.mp4", "local", None, None).await.unwrap();
        repo.create_job("b", "/tmp/b.mp4", "local", None, None).await.unwrap();
        repo.update_job_status("a", JobStatusUpdate { status: "running", ..Default::default() }).await.unwrap();

        let running = repo.list_jobs_by_status(&["running"], 10).await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, "a");
    }

    #[tokio::test]
    async fn list_jobs_by_status_with_empty_filter_returns_empty() {
        let (_conn, repo) = setup().await;
        assert!(repo.list_jobs_by_status(&[], 10).await.unwrap().is_empty());
    }
}
