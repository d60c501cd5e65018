use std::sync::Arc;

use mastery_core::model::Catalog;
use storage::repository::Storage;

use crate::Clock;
use crate::dashboard::DashboardService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;

/// Assembles the services one learner session needs.
pub struct AppServices {
    progress: ProgressService,
    dashboard: DashboardService,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or loading
    /// persisted progress fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Arc<Catalog>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(&storage, clock, catalog).await
    }

    /// Build services over an in-memory store that lives as long as the process.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the session cannot be started.
    pub async fn in_memory(clock: Clock, catalog: Arc<Catalog>) -> Result<Self, AppServicesError> {
        Self::with_storage(&Storage::in_memory(), clock, catalog).await
    }

    async fn with_storage(
        storage: &Storage,
        clock: Clock,
        catalog: Arc<Catalog>,
    ) -> Result<Self, AppServicesError> {
        let progress = ProgressService::start(clock, catalog, storage).await?;
        Ok(Self {
            progress,
            dashboard: DashboardService::default(),
        })
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressService {
        &mut self.progress
    }

    #[must_use]
    pub fn dashboard(&self) -> DashboardService {
        self.dashboard
    }
}
