//! Shared error types for the services crate.

use thiserror::Error;

use mastery_core::ProgressError;
use mastery_core::model::{CatalogError, ModuleId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("lesson {index} is out of range for module {module} ({count} lessons)")]
    LessonOutOfRange {
        module: ModuleId,
        index: usize,
        count: usize,
    },
    #[error("module {0} has no quiz")]
    NoQuiz(ModuleId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}
