use chrono::Utc;
use mastery_core::ProgressSnapshot;
use mastery_core::model::ActivityEntry;
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::activity_repo::insert_activity;
use super::mapping::{conn_err, module_id_from_str, ser};
use crate::repository::{ProgressRepository, StorageError};

fn check_range(snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
    match snapshot
        .iter()
        .find(|(_, percent)| !(0.0..=100.0).contains(percent))
    {
        Some((module, percent)) => Err(StorageError::Serialization(format!(
            "percent out of range for {module}: {percent}"
        ))),
        None => Ok(()),
    }
}

async fn upsert_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &ProgressSnapshot,
) -> Result<(), StorageError> {
    check_range(snapshot)?;
    let now = Utc::now();
    for (module, percent) in snapshot.iter() {
        sqlx::query(
            r"
            INSERT INTO module_progress (module_id, percent, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(module_id) DO UPDATE SET
                percent = excluded.percent,
                updated_at = excluded.updated_at
            ",
        )
        .bind(module.as_str())
        .bind(percent)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(conn_err)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_snapshot(&self) -> Result<ProgressSnapshot, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT module_id, percent
            FROM module_progress
            ORDER BY module_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut snapshot = ProgressSnapshot::new();
        for row in rows {
            let module = module_id_from_str(row.try_get::<String, _>("module_id").map_err(ser)?)?;
            let percent: f64 = row.try_get("percent").map_err(ser)?;
            snapshot.insert(module, percent);
        }
        Ok(snapshot)
    }

    async fn save_snapshot(&self, snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        upsert_snapshot(&mut tx, snapshot).await?;
        tx.commit().await.map_err(conn_err)
    }

    async fn record_progress(
        &self,
        entry: &ActivityEntry,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        // Dropping `tx` on an early return rolls both writes back.
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        insert_activity(&mut tx, entry).await?;
        upsert_snapshot(&mut tx, snapshot).await?;
        tx.commit().await.map_err(conn_err)
    }
}
