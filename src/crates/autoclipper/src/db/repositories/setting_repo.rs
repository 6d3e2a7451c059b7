//! Repository for `settings` rows.

use std::collections::HashMap;

use chrono::Utc;

use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;
use crate::db::models::Setting;

#[derive(Clone)]
pub struct SettingRepository {
    pool: DatabasePool,
}

impl SettingRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_setting(&self, key: &str, value: &str) -> DbResult<Setting> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE key = ?").bind(key).fetch_one(&self.pool).await?;
        Ok(row)
    }

    pub async fn get_setting(&self, key: &str) -> DbResult<Option<Setting>> {
        let row = sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE key = ?").bind(key).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    pub async fn get_all_settings(&self) -> DbResult<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, Setting>("SELECT * FROM settings").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }
}
