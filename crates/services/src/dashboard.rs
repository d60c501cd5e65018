use rand::Rng;
use serde::Serialize;

use mastery_core::model::{ModuleId, SkillLevel};

use crate::progress_service::ProgressService;

/// Modules strictly above this percent are candidates for a review nudge.
pub const REVIEW_THRESHOLD_PERCENT: u8 = 50;

/// At most this many review suggestions are shown.
pub const MAX_REVIEW_SUGGESTIONS: usize = 3;

/// Default per-module chance of being suggested for review.
pub const DEFAULT_REVIEW_CHANCE: f64 = 0.3;

/// One row of the per-module progress chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRow {
    pub id: ModuleId,
    pub title: String,
    pub percent: u8,
    pub badge_awarded: bool,
    pub best_quiz_percent: Option<u8>,
}

/// The module the learner should continue with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextModule {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
    pub difficulty: SkillLevel,
    pub estimated_time: Option<String>,
    pub percent: u8,
    /// Advisory only.
    pub unmet_prerequisites: Vec<ModuleId>,
}

/// Everything the dashboard page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub completed_count: usize,
    pub total_modules: usize,
    pub completion_percent: u8,
    pub hours_studied: f64,
    pub skill_level: SkillLevel,
    pub badges: Vec<String>,
    pub next_up: Option<NextModule>,
    pub modules: Vec<ModuleRow>,
}

/// Read-only projections over a [`ProgressService`] for the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct DashboardService {
    review_chance: f64,
}

impl Default for DashboardService {
    fn default() -> Self {
        Self::new(DEFAULT_REVIEW_CHANCE)
    }
}

impl DashboardService {
    /// `review_chance` is clamped into `[0, 1]`; NaN falls back to the default.
    #[must_use]
    pub fn new(review_chance: f64) -> Self {
        let review_chance = if review_chance.is_nan() {
            DEFAULT_REVIEW_CHANCE
        } else {
            review_chance.clamp(0.0, 1.0)
        };
        Self { review_chance }
    }

    #[must_use]
    pub fn dashboard(&self, progress: &ProgressService) -> DashboardView {
        let store = progress.store();
        let catalog = progress.catalog();
        let summary = store.aggregate();

        let modules = store
            .iter()
            .filter_map(|record| {
                let module = catalog.module(record.module())?;
                Some(ModuleRow {
                    id: module.id.clone(),
                    title: module.title.clone(),
                    percent: record.percent(),
                    badge_awarded: record.badge_awarded(),
                    best_quiz_percent: record.quiz_best_score_ratio().map(ratio_to_percent),
                })
            })
            .collect();

        let next_up = store.next_recommended().and_then(|id| {
            let module = catalog.module(id)?;
            Some(NextModule {
                id: id.clone(),
                title: module.title.clone(),
                description: module.description.clone(),
                difficulty: module.difficulty,
                estimated_time: module.estimated_time.clone(),
                percent: store.progress_of(id).unwrap_or(0),
                unmet_prerequisites: catalog.unmet_prerequisites(id, store),
            })
        });

        DashboardView {
            completed_count: summary.completed_count,
            total_modules: summary.total_modules,
            completion_percent: summary.completion_ratio_percent(),
            hours_studied: progress.study_log().hours_studied(),
            skill_level: progress.skill_level(),
            badges: summary.badges,
            next_up,
            modules,
        }
    }

    /// Pick modules to nudge for review.
    ///
    /// Each module above [`REVIEW_THRESHOLD_PERCENT`] is picked independently
    /// with the configured chance, keeping at most [`MAX_REVIEW_SUGGESTIONS`].
    pub fn suggest_reviews<R: Rng>(
        &self,
        progress: &ProgressService,
        rng: &mut R,
    ) -> Vec<ModuleId> {
        progress
            .store()
            .iter()
            .filter(|r| r.percent() > REVIEW_THRESHOLD_PERCENT)
            .filter(|_| rng.random_bool(self.review_chance))
            .take(MAX_REVIEW_SUGGESTIONS)
            .map(|r| r.module().clone())
            .collect()
    }
}

fn ratio_to_percent(ratio: f64) -> u8 {
    // Ratio is in [0, 1].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (ratio.clamp(0.0, 1.0) * 100.0).round() as u8;
    pct
}
