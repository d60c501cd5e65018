//! Per-session completion state for every module in a curriculum.
//!
//! A [`ProgressStore`] owns one [`ProgressRecord`] per module id, created at
//! 0% and only ever raised. Lessons add `100 / lesson_count` percent; a passed
//! quiz adds a fixed mastery bonus. Everything is clamped to `[0, 100]`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Catalog, ModuleId, QuizQuestion};

/// Percent at which a module counts as completed.
pub const COMPLETE_PERCENT: f64 = 100.0;

/// Progress credit granted by a passed quiz.
pub const QUIZ_PASS_BONUS: f64 = 10.0;

/// A quiz passes when `score / total >= PASS_NUMERATOR / PASS_DENOMINATOR` (70%).
pub const PASS_NUMERATOR: u64 = 7;
pub const PASS_DENOMINATOR: u64 = 10;

// Accumulated `100 / n` increments can land a hair under 100.
const COMPLETE_EPSILON: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a single record. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// Completion state of one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRecord {
    module: ModuleId,
    percent: f64,
    quiz_best_score_ratio: Option<f64>,
    badge: Option<String>,
}

impl ProgressRecord {
    fn new(module: ModuleId, badge: Option<String>) -> Self {
        Self {
            module,
            percent: 0.0,
            quiz_best_score_ratio: None,
            badge,
        }
    }

    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Exact percent in `[0, 100]`; lesson credit is fractional.
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        self.percent
    }

    /// Whole percent, rounded down so that only a finished module reads 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        // `percent` is kept in [0, 100].
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = self.percent.floor() as u8;
        whole
    }

    #[must_use]
    pub fn quiz_best_score_ratio(&self) -> Option<f64> {
        self.quiz_best_score_ratio
    }

    /// Badge the module would award, whether or not it is earned yet.
    #[must_use]
    pub fn badge(&self) -> Option<&str> {
        self.badge.as_deref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent >= COMPLETE_PERCENT
    }

    /// Derived on every read; never stored.
    #[must_use]
    pub fn badge_awarded(&self) -> bool {
        self.is_complete() && self.badge.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> ProgressPhase {
        if self.is_complete() {
            ProgressPhase::Completed
        } else if self.percent > 0.0 {
            ProgressPhase::InProgress
        } else {
            ProgressPhase::NotStarted
        }
    }

    fn raise_to(&mut self, target: f64) {
        let target = clamp_percent(target);
        if target > self.percent {
            self.percent = target;
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let clamped = value.clamp(0.0, COMPLETE_PERCENT);
    if COMPLETE_PERCENT - clamped < COMPLETE_EPSILON {
        COMPLETE_PERCENT
    } else {
        clamped
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// The learner's choice for one question. `selected == None` means unanswered.
#[derive(Debug, Clone, Copy)]
pub struct QuizAnswer<'a> {
    pub selected: Option<usize>,
    pub question: &'a QuizQuestion,
}

impl<'a> QuizAnswer<'a> {
    #[must_use]
    pub fn new(selected: Option<usize>, question: &'a QuizQuestion) -> Self {
        Self { selected, question }
    }
}

/// Outcome of one scored pass through a quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub score: u32,
    pub total_possible: u32,
    pub passed: bool,
    /// Per-question correctness, in answer order.
    pub correct: Vec<bool>,
    pub bonus_applied: bool,
    pub percent_after: f64,
}

impl QuizResult {
    #[must_use]
    pub fn score_ratio(&self) -> f64 {
        if self.total_possible == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_possible)
    }

    /// Score as a whole percentage, rounded half away from zero.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        // Ratio is in [0, 1].
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = (self.score_ratio() * 100.0).round() as u32;
        pct
    }
}

//
// ─── SUMMARY / SNAPSHOT ────────────────────────────────────────────────────────
//

/// Aggregate statistics across all records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub completed_count: usize,
    pub total_modules: usize,
    /// Earned badges, in initialization order.
    pub badges: Vec<String>,
}

impl ProgressSummary {
    /// Completed modules as a rounded percentage of all modules; 0 when empty.
    #[must_use]
    pub fn completion_ratio_percent(&self) -> u8 {
        if self.total_modules == 0 {
            return 0;
        }
        let ratio = (self.completed_count * 100 + self.total_modules / 2) / self.total_modules;
        u8::try_from(ratio).unwrap_or(100)
    }
}

/// Durable form of a store: `{module id -> percent complete}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressSnapshot(BTreeMap<ModuleId, f64>);

impl ProgressSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: ModuleId, percent: f64) {
        self.0.insert(module, percent);
    }

    #[must_use]
    pub fn get(&self, module: &ModuleId) -> Option<f64> {
        self.0.get(module).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, f64)> {
        self.0.iter().map(|(id, pct)| (id, *pct))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ModuleId, f64)> for ProgressSnapshot {
    fn from_iter<T: IntoIterator<Item = (ModuleId, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Single source of truth for one learner's completion state.
///
/// Not internally synchronized: callers keep one store per session and
/// mutate it through `&mut self`.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    records: Vec<ProgressRecord>,
    index: HashMap<ModuleId, usize>,
}

impl ProgressStore {
    /// Creates a record at 0% for every id, in iteration order.
    ///
    /// Duplicate ids collapse onto their first occurrence.
    #[must_use]
    pub fn initialize<I>(module_ids: I) -> Self
    where
        I: IntoIterator<Item = ModuleId>,
    {
        let mut store = Self::default();
        store.register_modules(module_ids);
        store
    }

    /// Like [`ProgressStore::initialize`], also attaching each module's badge.
    #[must_use]
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let mut store = Self::default();
        for module in catalog.modules() {
            store.insert_if_missing(module.id.clone(), module.badge.clone());
        }
        store
    }

    /// Adds records for ids not yet tracked. Existing records are left as they
    /// are, so calling this again never resets progress.
    ///
    /// Returns the number of records added.
    pub fn register_modules<I>(&mut self, module_ids: I) -> usize
    where
        I: IntoIterator<Item = ModuleId>,
    {
        module_ids
            .into_iter()
            .filter(|id| self.insert_if_missing(id.clone(), None))
            .count()
    }

    fn insert_if_missing(&mut self, module: ModuleId, badge: Option<String>) -> bool {
        if self.index.contains_key(&module) {
            return false;
        }
        self.index.insert(module.clone(), self.records.len());
        self.records.push(ProgressRecord::new(module, badge));
        true
    }

    fn record_mut(&mut self, module: &ModuleId) -> Result<&mut ProgressRecord, ProgressError> {
        match self.index.get(module) {
            Some(&i) => Ok(&mut self.records[i]),
            None => Err(ProgressError::UnknownModule(module.clone())),
        }
    }

    /// Credits one lesson of a module that has `lesson_count` lessons.
    ///
    /// Returns the new exact percent. Once a module is at 100 this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` if the module is not tracked and
    /// `ProgressError::InvalidArgument` if `lesson_count` is zero.
    pub fn complete_lesson(
        &mut self,
        module: &ModuleId,
        lesson_count: usize,
    ) -> Result<f64, ProgressError> {
        let record = self.record_mut(module)?;
        if lesson_count == 0 {
            return Err(ProgressError::InvalidArgument("lesson count must be at least 1"));
        }
        // Lesson counts are tiny; the conversion is exact.
        #[allow(clippy::cast_precision_loss)]
        let increment = COMPLETE_PERCENT / lesson_count as f64;
        record.raise_to(record.percent + increment);
        Ok(record.percent)
    }

    /// Scores a quiz attempt and grants the mastery bonus when it passes.
    ///
    /// Each correct answer earns its question's points; unanswered questions
    /// simply earn nothing. The bonus is skipped for completed modules.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` if the module is not tracked and
    /// `ProgressError::InvalidArgument` if there are no answers or the
    /// questions are worth zero points in total.
    pub fn record_quiz_attempt(
        &mut self,
        module: &ModuleId,
        answers: &[QuizAnswer<'_>],
    ) -> Result<QuizResult, ProgressError> {
        let record = self.record_mut(module)?;
        if answers.is_empty() {
            return Err(ProgressError::InvalidArgument("quiz attempt has no questions"));
        }

        let mut score: u32 = 0;
        let mut total_possible: u32 = 0;
        let mut correct = Vec::with_capacity(answers.len());
        for answer in answers {
            let points = answer.question.points();
            total_possible = total_possible.saturating_add(points);
            let is_correct = answer.question.is_correct(answer.selected);
            if is_correct {
                score = score.saturating_add(points);
            }
            correct.push(is_correct);
        }
        if total_possible == 0 {
            return Err(ProgressError::InvalidArgument("quiz is worth zero points"));
        }

        let passed =
            u64::from(score) * PASS_DENOMINATOR >= u64::from(total_possible) * PASS_NUMERATOR;
        let ratio = f64::from(score) / f64::from(total_possible);
        record.quiz_best_score_ratio = Some(
            record
                .quiz_best_score_ratio
                .map_or(ratio, |best| best.max(ratio)),
        );

        let bonus_applied = passed && !record.is_complete();
        if bonus_applied {
            record.raise_to(record.percent + QUIZ_PASS_BONUS);
        }

        Ok(QuizResult {
            score,
            total_possible,
            passed,
            correct,
            bonus_applied,
            percent_after: record.percent,
        })
    }

    /// Whole percent for a module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` if the module is not tracked.
    pub fn progress_of(&self, module: &ModuleId) -> Result<u8, ProgressError> {
        self.record(module).map(ProgressRecord::percent)
    }

    /// Full record for a module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` if the module is not tracked.
    pub fn record(&self, module: &ModuleId) -> Result<&ProgressRecord, ProgressError> {
        self.index
            .get(module)
            .map(|&i| &self.records[i])
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))
    }

    #[must_use]
    pub fn contains(&self, module: &ModuleId) -> bool {
        self.index.contains_key(module)
    }

    #[must_use]
    pub fn aggregate(&self) -> ProgressSummary {
        let completed_count = self.records.iter().filter(|r| r.is_complete()).count();
        let badges = self
            .records
            .iter()
            .filter(|r| r.badge_awarded())
            .filter_map(|r| r.badge.clone())
            .collect();
        ProgressSummary {
            completed_count,
            total_modules: self.records.len(),
            badges,
        }
    }

    /// First module, in initialization order, that is not complete.
    #[must_use]
    pub fn next_recommended(&self) -> Option<&ModuleId> {
        self.records
            .iter()
            .find(|r| !r.is_complete())
            .map(ProgressRecord::module)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.records
            .iter()
            .map(|r| (r.module.clone(), r.percent))
            .collect()
    }

    /// Applies a persisted snapshot on top of the current state.
    ///
    /// Values are clamped into `[0, 100]` and can only raise a record. Ids
    /// the store does not track are skipped and returned.
    pub fn restore(&mut self, snapshot: &ProgressSnapshot) -> Vec<ModuleId> {
        let mut skipped = Vec::new();
        for (module, percent) in snapshot.iter() {
            match self.index.get(module) {
                Some(&i) => self.records[i].raise_to(percent),
                None => skipped.push(module.clone()),
            }
        }
        skipped
    }

    /// Records in initialization order.
    pub fn iter(&self) -> impl Iterator<Item = &ProgressRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
