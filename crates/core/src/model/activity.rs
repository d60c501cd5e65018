use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ModuleId;

/// Study credit per logged activity, in hours.
pub const HOURS_PER_ACTIVITY: f64 = 0.5;

/// What the learner did in a logged activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lesson,
    Quiz,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Lesson => "lesson",
            ActivityKind::Quiz => "quiz",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lesson" => Some(Self::Lesson),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

/// One row of the study history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub module: ModuleId,
    pub kind: ActivityKind,
    pub minutes: u32,
    pub score: Option<u32>,
}

impl ActivityEntry {
    #[must_use]
    pub fn lesson(at: DateTime<Utc>, module: ModuleId, minutes: u32) -> Self {
        Self {
            at,
            module,
            kind: ActivityKind::Lesson,
            minutes,
            score: None,
        }
    }

    #[must_use]
    pub fn quiz(at: DateTime<Utc>, module: ModuleId, score: u32) -> Self {
        Self {
            at,
            module,
            kind: ActivityKind::Quiz,
            minutes: 0,
            score: Some(score),
        }
    }
}

/// Append-only study history for one learner session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyLog {
    entries: Vec<ActivityEntry>,
}

impl StudyLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: Vec<ActivityEntry>) -> Self {
        Self { entries }
    }

    pub fn record(&mut self, entry: ActivityEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat half hour per entry, rounded to one decimal.
    #[must_use]
    pub fn hours_studied(&self) -> f64 {
        // Entry counts stay far below 2^52.
        #[allow(clippy::cast_precision_loss)]
        let hours = self.entries.len() as f64 * HOURS_PER_ACTIVITY;
        (hours * 10.0).round() / 10.0
    }

    /// Total logged minutes for one module.
    #[must_use]
    pub fn minutes_for(&self, module: &ModuleId) -> u32 {
        self.entries
            .iter()
            .filter(|e| &e.module == module)
            .map(|e| e.minutes)
            .fold(0, u32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn hours_studied_counts_half_hour_per_entry() {
        let mut log = StudyLog::new();
        assert_eq!(log.hours_studied(), 0.0);

        let module = ModuleId::new("excel_basics").unwrap();
        for _ in 0..3 {
            log.record(ActivityEntry::lesson(fixed_now(), module.clone(), 25));
        }
        assert_eq!(log.hours_studied(), 1.5);
    }

    #[test]
    fn minutes_for_only_sums_matching_module() {
        let basics = ModuleId::new("excel_basics").unwrap();
        let dax = ModuleId::new("powerbi_dax").unwrap();
        let log = StudyLog::from_entries(vec![
            ActivityEntry::lesson(fixed_now(), basics.clone(), 25),
            ActivityEntry::lesson(fixed_now(), dax.clone(), 40),
            ActivityEntry::quiz(fixed_now(), basics.clone(), 20),
            ActivityEntry::lesson(fixed_now(), basics.clone(), 35),
        ]);
        assert_eq!(log.minutes_for(&basics), 60);
        assert_eq!(log.minutes_for(&dax), 40);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ActivityKind::Lesson, ActivityKind::Quiz] {
            assert_eq!(ActivityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityKind::parse("video"), None);
    }
}
