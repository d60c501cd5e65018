use async_trait::async_trait;
use mastery_core::ProgressSnapshot;
use mastery_core::model::{ActivityEntry, SkillLevel};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the `{module id -> percent}` snapshot.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the last saved snapshot. An empty snapshot means nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_snapshot(&self) -> Result<ProgressSnapshot, StorageError>;

    /// Persist every entry of the snapshot, replacing stored values for the
    /// same modules. Modules absent from the snapshot are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(&self, snapshot: &ProgressSnapshot) -> Result<(), StorageError>;

    /// Append `entry` to the activity log and save `snapshot` as one unit:
    /// either both are stored or neither is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails; nothing is stored in that case.
    async fn record_progress(
        &self,
        entry: &ActivityEntry,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the study activity log.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StorageError>;

    /// All entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_activity(&self) -> Result<Vec<ActivityEntry>, StorageError>;
}

/// Learner preferences that outlive a session.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// The saved skill level, `None` if the learner never set one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_skill_level(&self) -> Result<Option<SkillLevel>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the level cannot be stored.
    async fn save_skill_level(&self, level: SkillLevel) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    snapshot: Arc<Mutex<ProgressSnapshot>>,
    activity: Arc<Mutex<Vec<ActivityEntry>>>,
    skill_level: Arc<Mutex<Option<SkillLevel>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_snapshot(&self) -> Result<ProgressSnapshot, StorageError> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_snapshot(&self, snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for (module, percent) in snapshot.iter() {
            guard.insert(module.clone(), percent);
        }
        Ok(())
    }

    async fn record_progress(
        &self,
        entry: &ActivityEntry,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let mut activity = self
            .activity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut stored = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        activity.push(entry.clone());
        for (module, percent) in snapshot.iter() {
            stored.insert(module.clone(), percent);
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StorageError> {
        let mut guard = self
            .activity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(entry.clone());
        Ok(())
    }

    async fn list_activity(&self) -> Result<Vec<ActivityEntry>, StorageError> {
        let guard = self
            .activity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn load_skill_level(&self) -> Result<Option<SkillLevel>, StorageError> {
        let guard = self
            .skill_level
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(*guard)
    }

    async fn save_skill_level(&self, level: SkillLevel) -> Result<(), StorageError> {
        let mut guard = self
            .skill_level
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(level);
        Ok(())
    }
}

/// Aggregates progress, activity and settings repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let activity: Arc<dyn ActivityRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn SettingsRepository> = Arc::new(repo);
        Self {
            progress,
            activity,
            settings,
        }
    }
}
