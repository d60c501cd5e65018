#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard;
pub mod error;
pub mod progress_service;

pub use mastery_core::Clock;

pub use app_services::AppServices;
pub use dashboard::{DashboardService, DashboardView, ModuleRow, NextModule};
pub use error::{AppServicesError, ProgressServiceError};
pub use progress_service::{LessonOutcome, ProgressService};
