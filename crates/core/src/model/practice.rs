use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::catalog::{SkillLevel, parse_minutes};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("exercise {0:?} has no steps")]
    NoSteps(String),

    #[error("case study {0:?} has no tasks")]
    NoTasks(String),
}

//
// ─── PRACTICE EXERCISE ─────────────────────────────────────────────────────────
//

/// Hands-on task attached to a module, done outside the lesson flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeExercise {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub steps: Vec<String>,
    #[serde(default)]
    pub difficulty: SkillLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_file: Option<String>,
}

impl PracticeExercise {
    /// # Errors
    ///
    /// Returns `PracticeError` if the title is blank or there are no steps.
    pub fn validate(&self) -> Result<(), PracticeError> {
        if self.title.trim().is_empty() {
            return Err(PracticeError::EmptyTitle);
        }
        if self.steps.is_empty() {
            return Err(PracticeError::NoSteps(self.title.clone()));
        }
        Ok(())
    }

    /// `estimated_time` in whole minutes, when it can be read.
    #[must_use]
    pub fn estimated_minutes(&self) -> Option<u32> {
        self.estimated_time.as_deref().and_then(parse_minutes)
    }
}

//
// ─── CASE STUDY ────────────────────────────────────────────────────────────────
//

/// Open-ended business scenario that applies a module's material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scenario: String,
    pub tasks: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_provided: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_file: Option<String>,
}

impl CaseStudy {
    /// # Errors
    ///
    /// Returns `PracticeError` if the title is blank or there are no tasks.
    pub fn validate(&self) -> Result<(), PracticeError> {
        if self.title.trim().is_empty() {
            return Err(PracticeError::EmptyTitle);
        }
        if self.tasks.is_empty() {
            return Err(PracticeError::NoTasks(self.title.clone()));
        }
        Ok(())
    }
}
