mod activity;
mod catalog;
mod ids;
mod practice;
mod quiz;

pub use activity::{ActivityEntry, ActivityKind, HOURS_PER_ACTIVITY, StudyLog};
pub use catalog::{Catalog, CatalogError, Lesson, Module, SkillLevel};
pub use ids::{ModuleId, ParseIdError};
pub use practice::{CaseStudy, PracticeError, PracticeExercise};
pub use quiz::{QuestionDifficulty, QuizError, QuizQuestion};
