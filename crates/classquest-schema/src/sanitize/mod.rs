//! Schema-driven repair of untrusted documents.
//!
//! [`sanitize`] walks a decoded JSON value field by field and builds a
//! canonical [`AppState`]. Missing or malformed fields are replaced with
//! typed defaults and reported as [`FieldRepair`]s; only a root that is not
//! an object is rejected. Unknown fields are ignored.
//!
//! The pass is idempotent: sanitizing the serialized output of a previous
//! pass yields the same state and no repairs.

mod coerce;
mod entities;
mod settings;

use classquest_progress::{compute_class_progress, normalize_milestone_step};
use classquest_types::{AppState, ClassProgressCache, Student};
use serde_json::{Map, Value};

use self::coerce::{Read, Repairs, integer, type_name};
use crate::error::StructuralError;
use crate::repair::{FieldRepair, RepairKind};

pub use self::entities::EPOCH_AWARDED_AT;

/// A repaired document and what was repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    /// The canonical document.
    pub state: AppState,
    /// Every field the pass had to change, in document order.
    pub repairs: Vec<FieldRepair>,
}

impl Sanitized {
    /// Whether the input was already canonical.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

/// Repair a decoded document.
///
/// # Errors
///
/// Returns [`StructuralError::NotARecord`] if `raw` is not a JSON object.
pub fn sanitize(raw: &Value) -> Result<Sanitized, StructuralError> {
    sanitize_at(raw, chrono::Utc::now().timestamp_millis())
}

/// Decode and repair document text.
///
/// # Errors
///
/// Returns [`StructuralError::Decode`] for text that is not JSON and
/// [`StructuralError::NotARecord`] for JSON that is not an object.
pub fn sanitize_str(text: &str) -> Result<Sanitized, StructuralError> {
    let raw: Value = serde_json::from_str(text)?;
    sanitize(&raw)
}

/// [`sanitize`] with an explicit clock, used for missing timestamps.
///
/// # Errors
///
/// Returns [`StructuralError::NotARecord`] if `raw` is not a JSON object.
pub fn sanitize_at(raw: &Value, now_ms: i64) -> Result<Sanitized, StructuralError> {
    let Value::Object(root) = raw else {
        return Err(StructuralError::NotARecord {
            found: type_name(raw),
        });
    };
    let mut repairs = Repairs::default();

    let version = version(root, &mut repairs);
    let settings = settings::settings(root, now_ms, &mut repairs);
    let students = entities::students(root, &mut repairs);
    let teams = entities::teams(root, &mut repairs);
    let quests = entities::quests(root, &mut repairs);
    let logs = entities::logs(root, now_ms, &mut repairs);
    let badge_defs = entities::badge_defs(root, &mut repairs);
    let categories = entities::categories(root, &mut repairs);
    let class_progress =
        class_progress(root, &students, settings.class_milestone_step, &mut repairs);

    let state = AppState {
        version,
        students,
        teams,
        quests,
        logs,
        settings,
        class_progress: Some(class_progress),
        badge_defs,
        categories,
    };
    let repairs = repairs.into_vec();
    if !repairs.is_empty() {
        tracing::debug!(count = repairs.len(), version, "Sanitized document with repairs");
    }
    Ok(Sanitized { state, repairs })
}

/// Stored version, at least 1. Versions newer than this build are kept so
/// the migrator can refuse them.
fn version(root: &Map<String, Value>, repairs: &mut Repairs) -> u32 {
    let read = match integer(root.get("version")) {
        Read::Valid(v) => Some(v),
        Read::Coerced(v) => {
            repairs.note("version", RepairKind::Coerced);
            Some(v)
        }
        Read::Missing | Read::Invalid => None,
    };
    let Some(raw) = read else {
        repairs.note("version", RepairKind::Defaulted);
        return 1;
    };
    let clamped = raw.clamp(1, i64::from(u32::MAX));
    if clamped != raw {
        repairs.note("version", RepairKind::Clamped);
    }
    u32::try_from(clamped).unwrap_or(1)
}

/// Rebuild the denormalized progress cache from the students.
fn class_progress(
    root: &Map<String, Value>,
    students: &[Student],
    step: u32,
    repairs: &mut Repairs,
) -> ClassProgressCache {
    let step = normalize_milestone_step(Some(i64::from(step)));
    let progress = compute_class_progress(students.iter().map(|s| s.xp), step);
    let cache = ClassProgressCache {
        total_xp: progress.total_xp,
        stars: progress.stars,
    };
    let stored = root.get("classProgress").and_then(Value::as_object).map(|obj| {
        (
            obj.get("totalXP").and_then(Value::as_u64),
            obj.get("stars").and_then(Value::as_u64),
        )
    });
    if stored != Some((Some(cache.total_xp), Some(cache.stars))) {
        repairs.note("classProgress", RepairKind::Recomputed);
    }
    cache
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_record_roots_are_structural_errors() {
        for raw in [json!(null), json!([1, 2]), json!("state"), json!(3)] {
            assert!(matches!(sanitize(&raw), Err(StructuralError::NotARecord { .. })));
        }
        assert!(matches!(sanitize_str("{ not json"), Err(StructuralError::Decode(_))));
    }

    #[test]
    fn empty_record_becomes_default_document() {
        let out = sanitize(&json!({})).unwrap();
        assert_eq!(out.state.version, 1);
        assert!(out.state.students.is_empty());
        assert_eq!(out.state.settings.class_milestone_step, 1000);
        assert_eq!(
            out.state.class_progress,
            Some(ClassProgressCache { total_xp: 0, stars: 0 })
        );
        assert!(!out.is_clean());
    }

    #[test]
    fn version_is_preserved_or_defaulted() {
        assert_eq!(sanitize(&json!({ "version": 3 })).unwrap().state.version, 3);
        assert_eq!(sanitize(&json!({ "version": 99 })).unwrap().state.version, 99);
        assert_eq!(sanitize(&json!({ "version": "x" })).unwrap().state.version, 1);
        assert_eq!(sanitize(&json!({ "version": -2 })).unwrap().state.version, 1);
    }

    #[test]
    fn class_progress_cache_is_recomputed() {
        let out = sanitize(&json!({
            "settings": { "classMilestoneStep": 100 },
            "students": [
                { "id": "a", "alias": "A", "xp": 150 },
                { "id": "b", "alias": "B", "xp": -20 },
                { "id": "c", "alias": "C", "xp": 75 }
            ],
            "classProgress": { "totalXP": 9999, "stars": 99 }
        }))
        .unwrap();
        assert_eq!(
            out.state.class_progress,
            Some(ClassProgressCache { total_xp: 205, stars: 2 })
        );
        assert!(out.repairs.iter().any(|r| r.path == "classProgress"));
    }

    #[test]
    fn unknown_fields_are_stripped() {
        let out = sanitize(&json!({
            "students": [{ "id": "s1", "alias": "A", "xp": 0, "secret": true }],
            "legacyBlob": { "a": 1 }
        }))
        .unwrap();
        let back = serde_json::to_value(&out.state).unwrap();
        assert!(back.get("legacyBlob").is_none());
        assert!(back["students"][0].get("secret").is_none());
    }
}
