use chrono::{DateTime, Utc};
use mastery_core::model::{ActivityEntry, ActivityKind, ModuleId, SkillLevel};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn module_id_from_str(raw: String) -> Result<ModuleId, StorageError> {
    ModuleId::new(raw).map_err(ser)
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_activity_kind(s: &str) -> Result<ActivityKind, StorageError> {
    ActivityKind::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid activity kind: {s}")))
}

pub(crate) fn parse_skill_level(s: &str) -> Result<SkillLevel, StorageError> {
    SkillLevel::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid skill level: {s}")))
}

pub(crate) fn map_activity_row(row: &SqliteRow) -> Result<ActivityEntry, StorageError> {
    let at: DateTime<Utc> = row.try_get("at").map_err(ser)?;
    let module = module_id_from_str(row.try_get::<String, _>("module_id").map_err(ser)?)?;
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = parse_activity_kind(&kind_str)?;
    let minutes = u32_from_i64("minutes", row.try_get::<i64, _>("minutes").map_err(ser)?)?;
    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|s| u32_from_i64("score", s))
        .transpose()?;

    Ok(ActivityEntry {
        at,
        module,
        kind,
        minutes,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_kind_parsing_rejects_unknown() {
        assert_eq!(parse_activity_kind("quiz").unwrap(), ActivityKind::Quiz);
        assert!(matches!(
            parse_activity_kind("video"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn skill_level_round_trips_through_its_name() {
        for level in [SkillLevel::Beginner, SkillLevel::Intermediate, SkillLevel::Advanced] {
            assert_eq!(parse_skill_level(level.as_str()).unwrap(), level);
        }
        assert!(parse_skill_level("Expert").is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(u32_from_i64("minutes", -1).is_err());
        assert_eq!(u32_from_i64("minutes", 25).unwrap(), 25);
    }
}
