use mastery_core::model::ActivityEntry;
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{conn_err, map_activity_row};
use crate::repository::{ActivityRepository, StorageError};

pub(super) async fn insert_activity(
    conn: &mut SqliteConnection,
    entry: &ActivityEntry,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
            INSERT INTO activity_log (module_id, kind, minutes, score, at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        ",
    )
    .bind(entry.module.as_str())
    .bind(entry.kind.as_str())
    .bind(i64::from(entry.minutes))
    .bind(entry.score.map(i64::from))
    .bind(entry.at)
    .execute(&mut *conn)
    .await
    .map_err(conn_err)?;
    Ok(())
}

#[async_trait::async_trait]
impl ActivityRepository for SqliteRepository {
    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        insert_activity(&mut conn, entry).await
    }

    async fn list_activity(&self) -> Result<Vec<ActivityEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT module_id, kind, minutes, score, at
                FROM activity_log
                ORDER BY at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_activity_row).collect()
    }
}
