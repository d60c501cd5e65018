#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ActivityRepository, InMemoryRepository, ProgressRepository, SettingsRepository, Storage,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
