use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ModuleId;
use crate::model::practice::{CaseStudy, PracticeError, PracticeExercise};
use crate::model::quiz::{QuizError, QuizQuestion};
use crate::progress::{COMPLETE_PERCENT, ProgressStore};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog defines module {0} more than once")]
    DuplicateModule(ModuleId),

    #[error("module {0} has no lessons")]
    NoLessons(ModuleId),

    #[error("module {module} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite {
        module: ModuleId,
        prerequisite: ModuleId,
    },

    #[error("module {module} quiz question {index}: {source}")]
    InvalidQuestion {
        module: ModuleId,
        index: usize,
        #[source]
        source: QuizError,
    },

    #[error("module {module} practice exercise {index}: {source}")]
    InvalidExercise {
        module: ModuleId,
        index: usize,
        #[source]
        source: PracticeError,
    },

    #[error("module {module} case study {index}: {source}")]
    InvalidCaseStudy {
        module: ModuleId,
        index: usize,
        #[source]
        source: PracticeError,
    },

    #[error("catalog document is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

//
// ─── SKILL LEVEL ───────────────────────────────────────────────────────────────
//

/// Three-step level used both for module difficulty and the learner's
/// self-reported skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
        }
    }

    /// Parses a level name, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Beginner, Self::Intermediate, Self::Advanced]
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One teaching unit inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    /// Human-readable length, e.g. `"25 min"` or `"1.5 hours"`.
    pub duration: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
}

impl Lesson {
    /// Parses `duration` into whole minutes.
    ///
    /// Understands a leading number followed by `min`/`minutes` or
    /// `h`/`hour`/`hours`. Returns `None` for anything else.
    #[must_use]
    pub fn minutes(&self) -> Option<u32> {
        parse_minutes(&self.duration)
    }
}

pub(crate) fn parse_minutes(text: &str) -> Option<u32> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.parse().ok()?;
    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "m" | "min" | "mins" | "minute" | "minutes" => 1.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60.0,
        _ => return None,
    };
    let minutes = (value * factor).round();
    if !minutes.is_finite() || minutes < 0.0 || minutes > f64::from(u32::MAX) {
        return None;
    }
    // Range checked above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(minutes as u32)
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A named unit of curriculum content composed of ordered lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub prerequisites: Vec<ModuleId>,
    #[serde(default)]
    pub difficulty: SkillLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub exercises: Vec<PracticeExercise>,
    #[serde(default)]
    pub case_studies: Vec<CaseStudy>,
}

impl Module {
    /// Number of lessons, used as the divisor for lesson completion credit.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        !self.quiz.is_empty()
    }

    /// Sum of all quiz question points.
    #[must_use]
    pub fn quiz_total_points(&self) -> u32 {
        self.quiz.iter().map(QuizQuestion::points).sum()
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct CatalogDocument {
    modules: Vec<Module>,
}

/// Validated, ordered, read-only set of modules.
#[derive(Debug, Clone)]
pub struct Catalog {
    modules: Vec<Module>,
    index: HashMap<ModuleId, usize>,
}

impl Catalog {
    /// Builds a catalog, keeping the given module order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for duplicate ids, modules without lessons,
    /// prerequisites that reference unknown modules, or invalid quiz questions.
    pub fn new(modules: Vec<Module>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(modules.len());
        for (position, module) in modules.iter().enumerate() {
            if index.insert(module.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateModule(module.id.clone()));
            }
            if module.lessons.is_empty() {
                return Err(CatalogError::NoLessons(module.id.clone()));
            }
            for (i, question) in module.quiz.iter().enumerate() {
                question
                    .validate()
                    .map_err(|source| CatalogError::InvalidQuestion {
                        module: module.id.clone(),
                        index: i,
                        source,
                    })?;
            }
            for (i, exercise) in module.exercises.iter().enumerate() {
                exercise
                    .validate()
                    .map_err(|source| CatalogError::InvalidExercise {
                        module: module.id.clone(),
                        index: i,
                        source,
                    })?;
            }
            for (i, case) in module.case_studies.iter().enumerate() {
                case.validate()
                    .map_err(|source| CatalogError::InvalidCaseStudy {
                        module: module.id.clone(),
                        index: i,
                        source,
                    })?;
            }
        }

        let known: HashSet<&ModuleId> = index.keys().collect();
        for module in &modules {
            if let Some(missing) = module.prerequisites.iter().find(|p| !known.contains(p)) {
                return Err(CatalogError::UnknownPrerequisite {
                    module: module.id.clone(),
                    prerequisite: missing.clone(),
                });
            }
        }

        Ok(Self { modules, index })
    }

    /// Parses a `{"modules": [...]}` JSON document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and any validation
    /// error from [`Catalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::new(doc.modules)
    }

    #[must_use]
    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|m| &m.id)
    }

    /// Quiz questions for a module; empty when the module has no quiz or is unknown.
    #[must_use]
    pub fn quiz(&self, id: &ModuleId) -> &[QuizQuestion] {
        self.module(id).map_or(&[], |m| m.quiz.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every practice exercise in catalog order, paired with its module.
    pub fn practice_exercises(&self) -> impl Iterator<Item = (&Module, &PracticeExercise)> {
        self.modules
            .iter()
            .flat_map(|m| m.exercises.iter().map(move |e| (m, e)))
    }

    /// Prerequisites of `id` that are not yet complete in `store`.
    ///
    /// Purely informational: nothing in the engine refuses progress on a
    /// module whose prerequisites are unfinished.
    #[must_use]
    pub fn unmet_prerequisites(&self, id: &ModuleId, store: &ProgressStore) -> Vec<ModuleId> {
        let Some(module) = self.module(id) else {
            return Vec::new();
        };
        module
            .prerequisites
            .iter()
            .filter(|p| {
                store
                    .record(p)
                    .ok()
                    .is_none_or(|r| r.percent_complete() < COMPLETE_PERCENT)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ModuleId {
        ModuleId::new(raw).unwrap()
    }

    fn lesson(title: &str, duration: &str) -> Lesson {
        Lesson {
            title: title.to_string(),
            duration: duration.to_string(),
            content: String::new(),
            exercise: None,
        }
    }

    fn module(raw: &str, prerequisites: &[&str]) -> Module {
        Module {
            id: id(raw),
            title: raw.to_string(),
            description: String::new(),
            lessons: vec![lesson("Intro", "25 min")],
            prerequisites: prerequisites.iter().map(|p| id(p)).collect(),
            difficulty: SkillLevel::Beginner,
            estimated_time: None,
            resources: Vec::new(),
            badge: None,
            quiz: Vec::new(),
            exercises: Vec::new(),
            case_studies: Vec::new(),
        }
    }

    #[test]
    fn lesson_minutes_parses_common_durations() {
        assert_eq!(lesson("a", "25 min").minutes(), Some(25));
        assert_eq!(lesson("a", "1.5 hours").minutes(), Some(90));
        assert_eq!(lesson("a", "45").minutes(), Some(45));
        assert_eq!(lesson("a", "a while").minutes(), None);
        assert_eq!(lesson("a", "3 days").minutes(), None);
    }

    #[test]
    fn rejects_duplicate_modules() {
        let err = Catalog::new(vec![module("a", &[]), module("a", &[])]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateModule(m) if m.as_str() == "a"));
    }

    #[test]
    fn rejects_unknown_prerequisite() {
        let err = Catalog::new(vec![module("b", &["missing"])]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownPrerequisite { .. }));
    }

    #[test]
    fn prerequisite_may_appear_later_in_order() {
        let catalog = Catalog::new(vec![module("b", &["a"]), module("a", &[])]).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn rejects_module_without_lessons() {
        let mut empty = module("a", &[]);
        empty.lessons.clear();
        let err = Catalog::new(vec![empty]).unwrap_err();
        assert!(matches!(err, CatalogError::NoLessons(_)));
    }

    #[test]
    fn from_json_validates_quiz_questions() {
        let json = r#"{"modules": [{
            "id": "excel_basics",
            "title": "Excel Fundamentals",
            "lessons": [{"title": "Interface", "duration": "25 min"}],
            "quiz": [{"question": "Q", "options": ["x"], "correct_index": 3, "points": 10}]
        }]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQuestion { index: 0, .. }));
    }

    #[test]
    fn from_json_preserves_order_and_defaults() {
        let json = r#"{"modules": [
            {"id": "z", "title": "Z", "lessons": [{"title": "L", "duration": "5 min"}]},
            {"id": "a", "title": "A", "lessons": [{"title": "L", "duration": "5 min"}],
             "difficulty": "Advanced", "badge": "A Badge", "prerequisites": ["z"]}
        ]}"#;
        let catalog = Catalog::from_json(json).unwrap();
        let ids: Vec<&str> = catalog.module_ids().map(ModuleId::as_str).collect();
        assert_eq!(ids, vec!["z", "a"]);
        let a = catalog.module(&id("a")).unwrap();
        assert_eq!(a.difficulty, SkillLevel::Advanced);
        assert_eq!(a.badge.as_deref(), Some("A Badge"));
        assert!(catalog.quiz(&id("a")).is_empty());
    }

    #[test]
    fn unmet_prerequisites_are_reported_not_enforced() {
        let catalog = Catalog::new(vec![module("a", &[]), module("b", &["a"])]).unwrap();
        let mut store = ProgressStore::for_catalog(&catalog);

        assert_eq!(catalog.unmet_prerequisites(&id("b"), &store), vec![id("a")]);

        store.complete_lesson(&id("b"), 1).unwrap();
        assert_eq!(store.progress_of(&id("b")).unwrap(), 100);

        store.complete_lesson(&id("a"), 1).unwrap();
        assert!(catalog.unmet_prerequisites(&id("b"), &store).is_empty());
    }

    #[test]
    fn from_json_reads_and_validates_practice_material() {
        let json = r#"{"modules": [
            {"id": "a", "title": "A", "lessons": [{"title": "L", "duration": "5 min"}],
             "exercises": [{"title": "Commission Calculator", "steps": ["Build a rate table"],
                            "difficulty": "Advanced", "skills": ["Lookup Functions"]}],
             "case_studies": [{"title": "Sales Analytics", "tasks": ["Design the data"],
                               "learning_outcomes": ["Dynamic reports"]}]},
            {"id": "b", "title": "B", "lessons": [{"title": "L", "duration": "5 min"}],
             "exercises": [{"title": "Dashboard", "steps": ["Add controls"]}]}
        ]}"#;
        let catalog = Catalog::from_json(json).unwrap();
        let a = catalog.module(&id("a")).unwrap();
        assert_eq!(a.case_studies[0].learning_outcomes, vec!["Dynamic reports"]);
        let titles: Vec<(&str, &str)> = catalog
            .practice_exercises()
            .map(|(m, e)| (m.id.as_str(), e.title.as_str()))
            .collect();
        assert_eq!(titles, [("a", "Commission Calculator"), ("b", "Dashboard")]);

        let bad = r#"{"modules": [{"id": "a", "title": "A",
            "lessons": [{"title": "L", "duration": "5 min"}],
            "case_studies": [{"title": "Inventory", "tasks": []}]}]}"#;
        let err = Catalog::from_json(bad).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidCaseStudy { index: 0, source: PracticeError::NoTasks(_), .. }
        ));
    }

    #[test]
    fn skill_level_parse_ignores_case() {
        assert_eq!(SkillLevel::parse("advanced"), Some(SkillLevel::Advanced));
        assert_eq!(SkillLevel::parse(" Intermediate "), Some(SkillLevel::Intermediate));
        assert_eq!(SkillLevel::parse("expert"), None);
    }
}
