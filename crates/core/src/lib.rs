#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use progress::{
    ProgressError, ProgressRecord, ProgressSnapshot, ProgressStore, ProgressSummary, QuizAnswer,
    QuizResult,
};
pub use time::Clock;
