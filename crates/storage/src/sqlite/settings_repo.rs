use chrono::Utc;
use mastery_core::model::SkillLevel;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn_err, parse_skill_level, ser};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait::async_trait]
impl SettingsRepository for SqliteRepository {
    async fn load_skill_level(&self) -> Result<Option<SkillLevel>, StorageError> {
        let row = sqlx::query("SELECT skill_level FROM learner_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("skill_level").map_err(ser)?;
        parse_skill_level(&raw).map(Some)
    }

    async fn save_skill_level(&self, level: SkillLevel) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learner_settings (id, skill_level, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                skill_level = excluded.skill_level,
                updated_at = excluded.updated_at
            ",
        )
        .bind(level.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;
        Ok(())
    }
}
