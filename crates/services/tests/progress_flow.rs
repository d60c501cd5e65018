use std::sync::Arc;

use async_trait::async_trait;
use mastery_core::ProgressSnapshot;
use mastery_core::model::{ActivityEntry, Catalog, ModuleId, SkillLevel};
use mastery_core::time::fixed_now;
use services::{AppServices, Clock, ProgressService, ProgressServiceError};
use storage::repository::{
    ActivityRepository, InMemoryRepository, ProgressRepository, Storage, StorageError,
};

const CATALOG: &str = r#"{"modules": [
    {
        "id": "excel_basics",
        "title": "Excel Fundamentals",
        "badge": "Excel Basics Master",
        "lessons": [
            {"title": "Interface", "duration": "25 min"},
            {"title": "Data Entry", "duration": "35 min"},
            {"title": "Formatting", "duration": "40 min"}
        ],
        "quiz": [
            {"question": "Q1", "options": ["a", "b"], "correct": 0, "points": 10},
            {"question": "Q2", "options": ["a", "b"], "correct": 1, "points": 15}
        ]
    },
    {
        "id": "powerbi_basics",
        "title": "Power BI Fundamentals",
        "badge": "Power BI Explorer",
        "prerequisites": ["excel_basics"],
        "lessons": [{"title": "Desktop tour", "duration": "30 min"}]
    }
]}"#;

fn id(raw: &str) -> ModuleId {
    ModuleId::new(raw).unwrap()
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json(CATALOG).unwrap())
}

/// Reads fine, refuses every write.
struct ReadOnlyProgress;

#[async_trait]
impl ProgressRepository for ReadOnlyProgress {
    async fn load_snapshot(&self) -> Result<ProgressSnapshot, StorageError> {
        Ok(ProgressSnapshot::new())
    }

    async fn save_snapshot(&self, _snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }

    async fn record_progress(
        &self,
        _entry: &ActivityEntry,
        _snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }
}

#[tokio::test]
async fn sqlite_session_reaches_completion_with_quiz_bonus() {
    let url = "sqlite:file:memdb_services_flow?mode=memory&cache=shared";
    let mut app = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("app services");

    let basics = id("excel_basics");
    let progress = app.progress_mut();
    progress.complete_lesson(&basics, 0).await.unwrap();
    progress.complete_lesson(&basics, 1).await.unwrap();
    assert_eq!(progress.progress_of(&basics).unwrap(), 66);

    let result = progress.submit_quiz(&basics, &[Some(0), Some(1)]).await.unwrap();
    assert!(result.passed);
    assert!(result.bonus_applied);
    assert_eq!(progress.progress_of(&basics).unwrap(), 76);

    let outcome = progress.complete_lesson(&basics, 2).await.unwrap();
    assert_eq!(outcome.percent, 100);
    assert!(outcome.newly_completed);

    let view = app.dashboard().dashboard(app.progress());
    assert_eq!(view.badges, vec!["Excel Basics Master".to_string()]);
    assert_eq!(view.completed_count, 1);
    assert_eq!(view.hours_studied, 2.0);
    assert_eq!(view.next_up.map(|n| n.id), Some(id("powerbi_basics")));

    let reopened = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("reopen");
    assert_eq!(reopened.progress().progress_of(&basics).unwrap(), 100);
    assert_eq!(reopened.progress().study_log().len(), 4);
}

#[tokio::test]
async fn failed_write_stores_nothing_and_undoes_the_change() {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        progress: Arc::new(ReadOnlyProgress),
        activity: Arc::new(repo.clone()),
        settings: Arc::new(repo.clone()),
    };
    let mut svc = ProgressService::start(Clock::fixed(fixed_now()), catalog(), &storage)
        .await
        .unwrap();

    let basics = id("excel_basics");
    let err = svc.complete_lesson(&basics, 0).await.unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Storage(StorageError::Connection(_))
    ));
    let err = svc.submit_quiz(&basics, &[Some(0), Some(1)]).await.unwrap_err();
    assert!(matches!(err, ProgressServiceError::Storage(_)));

    assert!(repo.list_activity().await.unwrap().is_empty());
    assert!(repo.load_snapshot().await.unwrap().is_empty());
    assert_eq!(svc.progress_of(&basics).unwrap(), 0);
    assert!(svc.store().record(&basics).unwrap().quiz_best_score_ratio().is_none());
    assert!(svc.study_log().is_empty());
}

#[tokio::test]
async fn sqlite_keeps_skill_level_between_runs() {
    let url = "sqlite:file:memdb_services_level?mode=memory&cache=shared";
    let mut app = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("app services");
    app.progress_mut()
        .set_skill_level(SkillLevel::Advanced)
        .await
        .unwrap();
    app.progress_mut()
        .complete_lesson(&id("powerbi_basics"), 0)
        .await
        .unwrap();

    let reopened = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), catalog())
        .await
        .expect("reopen");
    assert_eq!(reopened.progress().progress_of(&id("powerbi_basics")).unwrap(), 100);
    assert_eq!(reopened.progress().skill_level(), SkillLevel::Advanced);
    let view = reopened.dashboard().dashboard(reopened.progress());
    assert_eq!(view.skill_level, SkillLevel::Advanced);
}

#[tokio::test]
async fn restored_snapshot_ignores_retired_modules() {
    let repo = InMemoryRepository::new();
    let snapshot: ProgressSnapshot = vec![(id("excel_basics"), 40.0), (id("excel_vba"), 80.0)]
        .into_iter()
        .collect();
    repo.save_snapshot(&snapshot).await.unwrap();
    repo.append_activity(&ActivityEntry::lesson(fixed_now(), id("excel_vba"), 20))
        .await
        .unwrap();

    let storage = Storage {
        progress: Arc::new(repo.clone()),
        activity: Arc::new(repo.clone()),
        settings: Arc::new(repo),
    };
    let svc = ProgressService::start(Clock::fixed(fixed_now()), catalog(), &storage)
        .await
        .unwrap();

    assert_eq!(svc.progress_of(&id("excel_basics")).unwrap(), 40);
    assert!(svc.progress_of(&id("excel_vba")).is_err());
    assert_eq!(svc.store().len(), 2);
    assert_eq!(svc.study_log().hours_studied(), 0.5);
}

#[tokio::test]
async fn in_memory_app_services_start_empty() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()), catalog())
        .await
        .unwrap();
    let summary = app.progress().summary();
    assert_eq!(summary.completed_count, 0);
    assert_eq!(summary.total_modules, 2);
    assert!(summary.badges.is_empty());
}
