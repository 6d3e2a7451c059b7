//! Repository for `clips` rows.

use chrono::Utc;
use serde_json::Value;

use crate::db::connection::DatabasePool;
use crate::db::error::{DatabaseError, DbResult};
use crate::db::models::{Clip, VALID_CLIP_MODES};

#[derive(Clone)]
pub struct ClipRepository {
    pool: DatabasePool,
}

impl ClipRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_clip(
        &self,
        clip_id: &str,
        job_id: &str,
        file_path: &str,
        thumbnail_path: Option<&str>,
        mode: &str,
        viral_score: i64,
        duration_sec: i64,
        metadata: &Value,
    ) -> DbResult<Clip> {
        if !VALID_CLIP_MODES.contains(&mode) {
            return Err(DatabaseError::constraint(format!("invalid clip mode: {mode}")));
        }

        let metadata_json = serde_json::to_string(metadata).map_err(|e| DatabaseError::type_error(e.to_string()))?;
        sqlx::query(
            "INSERT INTO clips (id, job_id, file_path, thumbnail_path, mode, viral_score, duration_sec, metadata_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(clip_id)
        .bind(job_id)
        .bind(file_path)
        .bind(thumbnail_path)
        .bind(mode)
        .bind(viral_score.max(0))
        .bind(duration_sec.max(0))
        .bind(metadata_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_clip(clip_id).await?.ok_or_else(|| DatabaseError::not_found(clip_id))
    }

    pub async fn get_clip(&self, clip_id: &str) -> DbResult<Option<Clip>> {
        let row = sqlx::query_as::<_, Clip>("SELECT * FROM clips WHERE id = ?").bind(clip_id).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    pub async fn get_clips_by_job(&self, job_id: &str) -> DbResult<Vec<Clip>> {
        let rows = sqlx::query_as::<_, Clip>("SELECT * FROM clips WHERE job_id = ? ORDER BY created_at ASC")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn delete_clips_for_job(&self, job_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM clips WHERE job_id = ?").bind(job_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
