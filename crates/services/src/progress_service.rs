use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use mastery_core::model::{ActivityEntry, Catalog, ModuleId, SkillLevel, StudyLog};
use mastery_core::progress::COMPLETE_PERCENT;
use mastery_core::{ProgressError, ProgressStore, ProgressSummary, QuizAnswer, QuizResult};
use storage::repository::{ProgressRepository, SettingsRepository, Storage};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of crediting one lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonOutcome {
    pub module: ModuleId,
    pub percent: u8,
    pub percent_exact: f64,
    /// True only on the call that pushed the module to 100.
    pub newly_completed: bool,
    /// Badge earned by this call, if any.
    pub badge: Option<String>,
}

/// Catalog-aware front for one learner session.
///
/// Owns the session's [`ProgressStore`] and study log, resolves lesson counts
/// and quiz questions from the catalog, and writes every change through to
/// storage. A change that cannot be stored is undone in memory as well.
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress_repo: Arc<dyn ProgressRepository>,
    settings_repo: Arc<dyn SettingsRepository>,
    store: ProgressStore,
    log: StudyLog,
    skill_level: SkillLevel,
}

impl ProgressService {
    /// Build the session state for `catalog` and load anything already persisted.
    ///
    /// Persisted modules that are no longer in the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the snapshot, activity log
    /// or settings cannot be read.
    pub async fn start(
        clock: Clock,
        catalog: Arc<Catalog>,
        storage: &Storage,
    ) -> Result<Self, ProgressServiceError> {
        let mut store = ProgressStore::for_catalog(&catalog);

        let snapshot = storage.progress.load_snapshot().await?;
        let skipped = store.restore(&snapshot);
        for module in &skipped {
            warn!(module = %module, "persisted progress for unknown module ignored");
        }

        let entries = storage.activity.list_activity().await?;
        let skill_level = storage.settings.load_skill_level().await?.unwrap_or_default();
        debug!(
            modules = store.len(),
            restored = snapshot.len() - skipped.len(),
            activities = entries.len(),
            skill_level = skill_level.as_str(),
            "progress session started"
        );

        Ok(Self {
            clock,
            catalog,
            progress_repo: Arc::clone(&storage.progress),
            settings_repo: Arc::clone(&storage.settings),
            store,
            log: StudyLog::from_entries(entries),
            skill_level,
        })
    }

    /// Mark lesson `lesson_index` (zero-based) of `module` as completed.
    ///
    /// Every call credits the module again, like pressing "completed" twice.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for unknown modules,
    /// `ProgressServiceError::LessonOutOfRange` for a bad index, and
    /// `ProgressServiceError::Storage` if persisting fails.
    pub async fn complete_lesson(
        &mut self,
        module: &ModuleId,
        lesson_index: usize,
    ) -> Result<LessonOutcome, ProgressServiceError> {
        let catalog = Arc::clone(&self.catalog);
        let definition = catalog
            .module(module)
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))?;
        let lesson = definition.lessons.get(lesson_index).ok_or_else(|| {
            ProgressServiceError::LessonOutOfRange {
                module: module.clone(),
                index: lesson_index,
                count: definition.lesson_count(),
            }
        })?;

        let before = self.store.clone();
        let was_complete = self.store.record(module)?.is_complete();
        let percent_exact = self
            .store
            .complete_lesson(module, definition.lesson_count())?;
        let record = self.store.record(module)?;
        let newly_completed = !was_complete && record.is_complete();
        let badge = if newly_completed {
            record.badge().map(str::to_owned)
        } else {
            None
        };
        let percent = record.percent();

        let minutes = lesson.minutes().unwrap_or(0);
        let entry = ActivityEntry::lesson(self.clock.now(), module.clone(), minutes);
        self.persist(entry, before).await?;

        debug!(module = %module, lesson = %lesson.title, percent, "lesson completed");
        if newly_completed {
            info!(module = %module, badge = badge.as_deref().unwrap_or("-"), "module completed");
        }

        Ok(LessonOutcome {
            module: module.clone(),
            percent,
            percent_exact,
            newly_completed,
            badge,
        })
    }

    /// Score a quiz attempt against the module's catalog quiz.
    ///
    /// `selections[i]` answers question `i`; `None` or a missing trailing
    /// entry leaves the question unanswered.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for unknown modules or more
    /// selections than questions, `ProgressServiceError::NoQuiz` when the
    /// module has no quiz, and `ProgressServiceError::Storage` if persisting
    /// fails.
    pub async fn submit_quiz(
        &mut self,
        module: &ModuleId,
        selections: &[Option<usize>],
    ) -> Result<QuizResult, ProgressServiceError> {
        let catalog = Arc::clone(&self.catalog);
        let definition = catalog
            .module(module)
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))?;
        if !definition.has_quiz() {
            return Err(ProgressServiceError::NoQuiz(module.clone()));
        }
        if selections.len() > definition.quiz.len() {
            return Err(ProgressError::InvalidArgument("more answers than quiz questions").into());
        }

        let answers: Vec<QuizAnswer<'_>> = definition
            .quiz
            .iter()
            .enumerate()
            .map(|(i, q)| QuizAnswer::new(selections.get(i).copied().flatten(), q))
            .collect();
        let before = self.store.clone();
        let result = self.store.record_quiz_attempt(module, &answers)?;

        let entry = ActivityEntry::quiz(self.clock.now(), module.clone(), result.score);
        self.persist(entry, before).await?;

        debug!(
            module = %module,
            score = result.score,
            total = result.total_possible,
            passed = result.passed,
            bonus = result.bonus_applied,
            "quiz attempt recorded"
        );
        if result.bonus_applied && result.percent_after >= COMPLETE_PERCENT {
            info!(module = %module, "module completed by quiz bonus");
        }

        Ok(result)
    }

    /// Store `entry` with the current snapshot, or put `before` back.
    async fn persist(
        &mut self,
        entry: ActivityEntry,
        before: ProgressStore,
    ) -> Result<(), ProgressServiceError> {
        let snapshot = self.store.snapshot();
        if let Err(err) = self.progress_repo.record_progress(&entry, &snapshot).await {
            warn!(module = %entry.module, error = %err, "progress not stored, change undone");
            self.store = before;
            return Err(err.into());
        }
        self.log.record(entry);
        Ok(())
    }

    /// Whole percent for a module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` if the module is unknown.
    pub fn progress_of(&self, module: &ModuleId) -> Result<u8, ProgressServiceError> {
        Ok(self.store.progress_of(module)?)
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.store.aggregate()
    }

    /// Record the learner's self-assessed level and keep it for later sessions.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the level cannot be saved;
    /// the current level is kept in that case.
    pub async fn set_skill_level(
        &mut self,
        level: SkillLevel,
    ) -> Result<(), ProgressServiceError> {
        if level == self.skill_level {
            return Ok(());
        }
        self.settings_repo.save_skill_level(level).await?;
        debug!(from = self.skill_level.as_str(), to = level.as_str(), "skill level updated");
        self.skill_level = level;
        Ok(())
    }

    #[must_use]
    pub fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    #[must_use]
    pub fn study_log(&self) -> &StudyLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mastery_core::time::fixed_now;
    use storage::repository::ProgressRepository;

    const CATALOG: &str = r#"{"modules": [
        {
            "id": "excel_basics",
            "title": "Excel Fundamentals",
            "badge": "Excel Basics Master",
            "lessons": [
                {"title": "Interface", "duration": "25 min"},
                {"title": "Data Entry", "duration": "35 min"}
            ],
            "quiz": [
                {"question": "Select sheet?", "options": ["Ctrl+A", "Ctrl+Shift+Space"], "correct": 1, "points": 10},
                {"question": "Autofill dates?", "options": ["Fill Handle", "Both"], "correct": 1, "points": 15}
            ]
        },
        {
            "id": "excel_formulas",
            "title": "Excel Formulas",
            "prerequisites": ["excel_basics"],
            "lessons": [{"title": "Fundamentals", "duration": "1 hour"}]
        }
    ]}"#;

    fn id(raw: &str) -> ModuleId {
        ModuleId::new(raw).unwrap()
    }

    async fn service(storage: &Storage) -> ProgressService {
        let catalog = Arc::new(Catalog::from_json(CATALOG).unwrap());
        ProgressService::start(Clock::fixed(fixed_now()), catalog, storage)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn complete_lesson_uses_catalog_lesson_count() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;

        let first = svc.complete_lesson(&id("excel_basics"), 0).await.unwrap();
        assert_eq!(first.percent, 50);
        assert!(!first.newly_completed);

        let second = svc.complete_lesson(&id("excel_basics"), 1).await.unwrap();
        assert_eq!(second.percent, 100);
        assert!(second.newly_completed);
        assert_eq!(second.badge.as_deref(), Some("Excel Basics Master"));

        let again = svc.complete_lesson(&id("excel_basics"), 1).await.unwrap();
        assert!(!again.newly_completed);
        assert!(again.badge.is_none());

        assert_eq!(svc.study_log().len(), 3);
        assert_eq!(svc.study_log().minutes_for(&id("excel_basics")), 95);
        assert_eq!(svc.summary().badges, vec!["Excel Basics Master".to_string()]);
    }

    #[tokio::test]
    async fn lesson_index_must_exist() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;
        let err = svc.complete_lesson(&id("excel_basics"), 2).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::LessonOutOfRange { index: 2, count: 2, .. }
        ));
        assert_eq!(svc.progress_of(&id("excel_basics")).unwrap(), 0);
        assert!(svc.study_log().is_empty());
    }

    #[tokio::test]
    async fn unknown_module_is_reported() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;
        let err = svc.complete_lesson(&id("powerbi_dax"), 0).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Progress(ProgressError::UnknownModule(_))
        ));
        assert!(svc.progress_of(&id("powerbi_dax")).is_err());
    }

    #[tokio::test]
    async fn prerequisites_do_not_block_progress() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;
        let outcome = svc.complete_lesson(&id("excel_formulas"), 0).await.unwrap();
        assert_eq!(outcome.percent, 100);
    }

    #[tokio::test]
    async fn submit_quiz_pairs_selections_with_questions() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;

        let result = svc
            .submit_quiz(&id("excel_basics"), &[Some(1), Some(1)])
            .await
            .unwrap();
        assert_eq!((result.score, result.total_possible), (25, 25));
        assert!(result.passed);
        assert_eq!(svc.progress_of(&id("excel_basics")).unwrap(), 10);

        let partial = svc.submit_quiz(&id("excel_basics"), &[Some(1)]).await.unwrap();
        assert_eq!(partial.score, 10);
        assert_eq!(partial.correct, vec![true, false]);
        assert!(!partial.passed);
        assert_eq!(svc.progress_of(&id("excel_basics")).unwrap(), 10);
    }

    #[tokio::test]
    async fn submit_quiz_rejects_extra_answers_and_missing_quiz() {
        let storage = Storage::in_memory();
        let mut svc = service(&storage).await;

        let err = svc
            .submit_quiz(&id("excel_basics"), &[Some(0), Some(0), Some(0)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Progress(ProgressError::InvalidArgument(_))
        ));

        let err = svc.submit_quiz(&id("excel_formulas"), &[]).await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::NoQuiz(_)));
    }

    #[tokio::test]
    async fn progress_survives_restart() {
        let storage = Storage::in_memory();
        {
            let mut svc = service(&storage).await;
            svc.complete_lesson(&id("excel_basics"), 0).await.unwrap();
        }

        let snapshot = storage.progress.load_snapshot().await.unwrap();
        assert_eq!(snapshot.get(&id("excel_basics")), Some(50.0));

        let svc = service(&storage).await;
        assert_eq!(svc.progress_of(&id("excel_basics")).unwrap(), 50);
        assert_eq!(svc.study_log().len(), 1);
        assert_eq!(svc.study_log().hours_studied(), 0.5);
    }

    #[tokio::test]
    async fn skill_level_is_kept_across_sessions() {
        let storage = Storage::in_memory();
        {
            let mut svc = service(&storage).await;
            assert_eq!(svc.skill_level(), SkillLevel::Beginner);
            svc.set_skill_level(SkillLevel::Advanced).await.unwrap();
            svc.complete_lesson(&id("excel_formulas"), 0).await.unwrap();
            assert_eq!(svc.skill_level(), SkillLevel::Advanced);
        }

        let svc = service(&storage).await;
        assert_eq!(svc.progress_of(&id("excel_formulas")).unwrap(), 100);
        assert_eq!(svc.skill_level(), SkillLevel::Advanced);
        assert_eq!(
            storage.settings.load_skill_level().await.unwrap(),
            Some(SkillLevel::Advanced)
        );
    }
}
