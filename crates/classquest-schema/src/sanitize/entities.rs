//! Collection sanitizers: students, teams, quests, logs, badge definitions,
//! and categories.
//!
//! Every collection follows the same rules. Entries that are not objects or
//! have no usable id are dropped. When an id repeats, the first entry wins.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use classquest_types::{
    AVATAR_STAGE_COUNT, AvatarMode, AvatarPack, Badge, BadgeDefinition, BadgeRule, Category,
    CategoryId, LogEntry, Quest, QuestTarget, QuestType, Student, StudentId, Team,
};
use serde_json::{Map, Value};

use super::coerce::{Read, Repairs, index, integer, join, text};
use crate::repair::RepairKind;

/// `awardedAt` for badges whose award time is unknown.
pub const EPOCH_AWARDED_AT: &str = "1970-01-01T00:00:00.000Z";

const UNNAMED_STUDENT: &str = "Unnamed";
const UNNAMED_TEAM: &str = "Team";
const UNNAMED_QUEST: &str = "Quest";
const UNNAMED_BADGE: &str = "Badge";
const UNNAMED_CATEGORY: &str = "Category";
const UNKNOWN_QUEST_NAME: &str = "Unknown";

/// First-wins id filter for one collection.
#[derive(Default)]
struct Unique {
    seen: HashSet<String>,
}

impl Unique {
    fn admit(&mut self, id: &str, path: &str, repairs: &mut Repairs) -> bool {
        if self.seen.insert(id.to_owned()) {
            true
        } else {
            repairs.note(path, RepairKind::Deduplicated);
            false
        }
    }
}

/// Read the `id` of an entry, dropping the entry when it has none.
fn entry_id(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Option<String> {
    let id = repairs.id(obj, "id", path);
    if id.is_none() {
        repairs.note(path, RepairKind::Dropped);
    }
    id
}

// =============================================================================
// Students
// =============================================================================

pub(crate) fn students(root: &Map<String, Value>, repairs: &mut Repairs) -> Vec<Student> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "students", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        out.push(student(StudentId::from(id), obj, &path, repairs));
    }
    out
}

fn student(id: StudentId, obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Student {
    let level = repairs.int_within(obj, "level", path, (1, i64::from(u32::MAX)), 1);
    Student {
        id,
        alias: repairs.text_or(obj, "alias", path, UNNAMED_STUDENT),
        xp: repairs.int_or(obj, "xp", path, 0),
        level: u32::try_from(level).unwrap_or(1),
        streaks: count_map(obj, "streaks", path, repairs),
        last_awarded_day: text_map(obj, "lastAwardedDay", path, repairs),
        badges: badges(obj, path, repairs),
        team_id: repairs.optional_text(obj, "teamId", path).map(Into::into),
        avatar_mode: avatar_mode(obj, path, repairs),
        avatar_pack: avatar_pack(obj, path, repairs),
    }
}

fn avatar_mode(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> AvatarMode {
    match text(obj.get("avatarMode")) {
        Read::Missing => AvatarMode::Procedural,
        Read::Valid(raw) if raw == "imagePack" || raw == "procedural" => AvatarMode::parse(&raw),
        other => {
            repairs.note(join(path, "avatarMode"), RepairKind::Coerced);
            other.value().map_or(AvatarMode::Procedural, |raw| AvatarMode::parse(&raw))
        }
    }
}

fn avatar_pack(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> AvatarPack {
    let pack_path = join(path, "avatarPack");
    let Some(pack) = repairs.object(obj, "avatarPack", path) else {
        return AvatarPack::default();
    };
    let keys_path = join(&pack_path, "stageKeys");
    let raw = match pack.get("stageKeys") {
        Some(Value::Array(items)) => items.as_slice(),
        None | Some(Value::Null) => return AvatarPack::default(),
        Some(_) => {
            repairs.note(keys_path, RepairKind::Defaulted);
            return AvatarPack::default();
        }
    };
    if raw.len() != AVATAR_STAGE_COUNT {
        repairs.note(keys_path.clone(), RepairKind::Coerced);
    }
    let stage_keys = (0..AVATAR_STAGE_COUNT)
        .map(|stage| match text(raw.get(stage)) {
            Read::Valid(key) => Some(key),
            Read::Coerced(key) => {
                repairs.note(index(&keys_path, stage), RepairKind::Coerced);
                Some(key)
            }
            Read::Missing => None,
            Read::Invalid => {
                repairs.note(index(&keys_path, stage), RepairKind::Dropped);
                None
            }
        })
        .collect();
    AvatarPack { stage_keys }
}

/// Map of id to non-negative count.
fn count_map(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    repairs: &mut Repairs,
) -> BTreeMap<String, u32> {
    let map_path = join(path, key);
    let Some(raw) = repairs.object(obj, key, path) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for (entry_key, value) in raw {
        let entry_path = join(&map_path, entry_key);
        let trimmed = entry_key.trim();
        if trimmed.is_empty() {
            repairs.note(entry_path, RepairKind::Dropped);
            continue;
        }
        let count = match integer(Some(value)) {
            Read::Valid(n) => n,
            Read::Coerced(n) => {
                repairs.note(entry_path.clone(), RepairKind::Coerced);
                n
            }
            Read::Missing | Read::Invalid => {
                repairs.note(entry_path.clone(), RepairKind::Defaulted);
                0
            }
        };
        let clamped = count.clamp(0, i64::from(u32::MAX));
        if clamped != count {
            repairs.note(entry_path, RepairKind::Clamped);
        }
        out.insert(trimmed.to_owned(), u32::try_from(clamped).unwrap_or(0));
    }
    out
}

/// Map of id to non-empty text.
fn text_map(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    repairs: &mut Repairs,
) -> BTreeMap<String, String> {
    let map_path = join(path, key);
    let Some(raw) = repairs.object(obj, key, path) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for (entry_key, value) in raw {
        let entry_path = join(&map_path, entry_key);
        let trimmed = entry_key.trim();
        let read = text(Some(value));
        if let (false, Read::Valid(v) | Read::Coerced(v)) = (trimmed.is_empty(), &read) {
            if matches!(read, Read::Coerced(_)) {
                repairs.note(entry_path, RepairKind::Coerced);
            }
            out.insert(trimmed.to_owned(), v.clone());
        } else {
            repairs.note(entry_path, RepairKind::Dropped);
        }
    }
    out
}

// =============================================================================
// Awarded badges
// =============================================================================

fn badges(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Vec<Badge> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (badge_path, badge) in repairs.records(obj, "badges", path) {
        let Some(id) = entry_id(badge, &badge_path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &badge_path, repairs) {
            continue;
        }
        out.push(Badge {
            id: id.into(),
            name: repairs.text_or(badge, "name", &badge_path, UNNAMED_BADGE),
            icon_key: icon_key(badge, &badge_path, repairs),
            description: repairs.optional_text(badge, "description", &badge_path),
            awarded_at: awarded_at(badge, &badge_path, repairs),
        });
    }
    out
}

/// `iconKey`, falling back to the legacy `icon` field.
fn icon_key(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Option<String> {
    if let Some(key) = repairs.optional_text(obj, "iconKey", path) {
        return Some(key);
    }
    let legacy = text(obj.get("icon")).value();
    if legacy.is_some() {
        repairs.note(join(path, "icon"), RepairKind::Coerced);
    }
    legacy
}

fn awarded_at(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> String {
    let field = join(path, "awardedAt");
    let normalized = text(obj.get("awardedAt"))
        .value()
        .and_then(|raw| parse_instant(&raw).map(|at| (raw, format_instant(at))));
    match normalized {
        Some((raw, formatted)) => {
            if raw != formatted {
                repairs.note(field, RepairKind::Coerced);
            }
            formatted
        }
        None => {
            repairs.note(field, RepairKind::Defaulted);
            EPOCH_AWARDED_AT.to_owned()
        }
    }
}

/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|at| at.and_utc())
        })
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Teams, quests, logs
// =============================================================================

pub(crate) fn teams(root: &Map<String, Value>, repairs: &mut Repairs) -> Vec<Team> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "teams", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        out.push(Team {
            id: id.into(),
            name: repairs.text_or(obj, "name", &path, UNNAMED_TEAM),
            member_ids: member_ids(obj, &path, repairs),
        });
    }
    out
}

fn member_ids(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Vec<StudentId> {
    let list_path = join(path, "memberIds");
    let raw = match obj.get("memberIds") {
        Some(Value::Array(items)) => items.as_slice(),
        None | Some(Value::Null) => return Vec::new(),
        Some(_) => {
            repairs.note(list_path, RepairKind::Defaulted);
            return Vec::new();
        }
    };
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (i, member) in raw.iter().enumerate() {
        let member_path = index(&list_path, i);
        let id = match text(Some(member)) {
            Read::Valid(id) => id,
            Read::Coerced(id) => {
                repairs.note(member_path.clone(), RepairKind::Coerced);
                id
            }
            Read::Missing | Read::Invalid => {
                repairs.note(member_path, RepairKind::Dropped);
                continue;
            }
        };
        if unique.admit(&id, &member_path, repairs) {
            out.push(StudentId::from(id));
        }
    }
    out
}

pub(crate) fn quests(root: &Map<String, Value>, repairs: &mut Repairs) -> Vec<Quest> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "quests", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        let quest_type = repairs
            .optional_text(obj, "type", &path)
            .and_then(|raw| QuestType::parse(&raw));
        if quest_type.is_none() {
            repairs.note(join(&path, "type"), RepairKind::Defaulted);
        }
        let target = repairs
            .optional_text(obj, "target", &path)
            .and_then(|raw| QuestTarget::parse(&raw));
        if target.is_none() {
            repairs.note(join(&path, "target"), RepairKind::Defaulted);
        }
        out.push(Quest {
            id: id.into(),
            name: repairs.text_or(obj, "name", &path, UNNAMED_QUEST),
            description: repairs.optional_text(obj, "description", &path),
            xp: repairs.int_or(obj, "xp", &path, 0),
            quest_type: quest_type.unwrap_or_default(),
            target: target.unwrap_or_default(),
            is_personal_to: repairs
                .optional_text(obj, "isPersonalTo", &path)
                .map(Into::into),
            active: repairs.flag_or(obj, "active", &path, true),
            category: repairs.optional_text(obj, "category", &path),
            category_id: repairs
                .optional_text(obj, "categoryId", &path)
                .map(CategoryId::from),
        });
    }
    out
}

/// Logs need both a student and a quest reference. The student may no
/// longer exist; such entries are kept for the audit trail.
pub(crate) fn logs(
    root: &Map<String, Value>,
    now_ms: i64,
    repairs: &mut Repairs,
) -> Vec<LogEntry> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "logs", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        let student_id = repairs.id(obj, "studentId", &path);
        let quest_id = repairs.id(obj, "questId", &path);
        let (Some(student_id), Some(quest_id)) = (student_id, quest_id) else {
            repairs.note(path, RepairKind::Dropped);
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        out.push(LogEntry {
            id: id.into(),
            timestamp: repairs.int_within(
                obj,
                "timestamp",
                &path,
                (0, i64::MAX),
                now_ms.max(0),
            ),
            student_id: student_id.into(),
            quest_id: quest_id.into(),
            quest_name: repairs.text_or(obj, "questName", &path, UNKNOWN_QUEST_NAME),
            xp: repairs.int_or(obj, "xp", &path, 0),
            note: repairs.optional_text(obj, "note", &path),
            quest_category: repairs.optional_text(obj, "questCategory", &path),
            quest_category_id: repairs
                .optional_text(obj, "questCategoryId", &path)
                .map(CategoryId::from),
        });
    }
    out
}

// =============================================================================
// Badge definitions and categories
// =============================================================================

pub(crate) fn badge_defs(
    root: &Map<String, Value>,
    repairs: &mut Repairs,
) -> Vec<BadgeDefinition> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "badgeDefs", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        out.push(BadgeDefinition {
            id: id.into(),
            name: repairs.text_or(obj, "name", &path, UNNAMED_BADGE),
            description: repairs.optional_text(obj, "description", &path),
            category: repairs.optional_text(obj, "category", &path),
            category_id: repairs
                .optional_text(obj, "categoryId", &path)
                .map(CategoryId::from),
            icon_key: icon_key(obj, &path, repairs),
            rule: badge_rule(obj, &path, repairs),
        });
    }
    out
}

fn badge_rule(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Option<BadgeRule> {
    let rule_path = join(path, "rule");
    let rule = repairs.object(obj, "rule", path)?;
    let range = (0, i64::from(u32::MAX));
    let threshold = repairs.int_within(rule, "threshold", &rule_path, range, 0);
    let threshold = u32::try_from(threshold).unwrap_or(0);
    match text(rule.get("type")).value().as_deref() {
        Some("total_xp") => Some(BadgeRule::TotalXp { threshold }),
        Some("category_xp") => {
            let category_id = repairs
                .optional_text(rule, "categoryId", &rule_path)
                .map(CategoryId::from);
            let category = repairs.optional_text(rule, "category", &rule_path);
            if category_id.is_none() && category.is_none() {
                repairs.note(rule_path, RepairKind::Dropped);
                return None;
            }
            Some(BadgeRule::CategoryXp {
                category_id,
                category,
                threshold,
            })
        }
        _ => {
            repairs.note(rule_path, RepairKind::Dropped);
            None
        }
    }
}

pub(crate) fn categories(root: &Map<String, Value>, repairs: &mut Repairs) -> Vec<Category> {
    let mut unique = Unique::default();
    let mut out = Vec::new();
    for (path, obj) in repairs.records(root, "categories", "") {
        let Some(id) = entry_id(obj, &path, repairs) else {
            continue;
        };
        if !unique.admit(&id, &path, repairs) {
            continue;
        }
        out.push(Category {
            id: id.into(),
            name: repairs.text_or(obj, "name", &path, UNNAMED_CATEGORY),
            color: repairs.optional_text(obj, "color", &path),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn root(value: &Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn students_without_id_are_dropped_and_duplicates_keep_first() {
        let doc = root(&json!({
            "students": [
                { "alias": "ghost" },
                { "id": "s1", "alias": "First" },
                { "id": "s1", "alias": "Second" },
                "not a record",
                { "id": " s2 ", "alias": "Trimmed" }
            ]
        }));
        let mut repairs = Repairs::default();
        let list = students(&doc, &mut repairs);

        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
        assert_eq!(list.first().map(|s| s.alias.as_str()), Some("First"));

        let kinds: Vec<RepairKind> = repairs.into_vec().iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RepairKind::Dropped));
        assert!(kinds.contains(&RepairKind::Deduplicated));
    }

    #[test]
    fn student_fields_are_coerced() {
        let doc = root(&json!({
            "students": [{
                "id": "s1",
                "alias": "  Mika ",
                "xp": "120",
                "level": 0,
                "streaks": { "q1": 2.7, " ": 3, "q2": -4 },
                "lastAwardedDay": { "q1": "2024-03-01", "q2": "" },
                "avatarMode": "imagePack",
                "avatarPack": { "stageKeys": ["a", null] }
            }]
        }));
        let mut repairs = Repairs::default();
        let list = students(&doc, &mut repairs);
        let student = list.first().cloned().unwrap_or_else(|| Student::new("x".into(), "x"));

        assert_eq!(student.alias, "Mika");
        assert_eq!(student.xp, 120);
        assert_eq!(student.level, 1);
        assert_eq!(student.streaks.get("q1"), Some(&2));
        assert_eq!(student.streaks.get("q2"), Some(&0));
        assert_eq!(student.streaks.len(), 2);
        assert_eq!(student.last_awarded_day.len(), 1);
        assert_eq!(student.avatar_mode, AvatarMode::ImagePack);
        assert_eq!(student.avatar_pack.stage_keys, vec![Some("a".to_owned()), None, None]);
    }

    #[test]
    fn badges_normalize_award_time_and_legacy_icon() {
        let doc = root(&json!({
            "students": [{
                "id": "s1",
                "alias": "A",
                "badges": [
                    { "id": "b1", "name": "Star", "icon": "star", "awardedAt": "2024-05-01T10:00:00+02:00" },
                    { "id": "b1", "name": "Dup", "awardedAt": "2024-05-01" },
                    { "id": "b2", "name": "Old", "awardedAt": "yesterday" }
                ]
            }]
        }));
        let mut repairs = Repairs::default();
        let list = students(&doc, &mut repairs);
        let badges = list.first().map(|s| s.badges.clone()).unwrap_or_default();

        assert_eq!(badges.len(), 2);
        let first = badges.first().cloned();
        assert_eq!(first.as_ref().and_then(|b| b.icon_key.as_deref()), Some("star"));
        assert_eq!(
            first.as_ref().map(|b| b.awarded_at.as_str()),
            Some("2024-05-01T08:00:00.000Z")
        );
        assert_eq!(badges.get(1).map(|b| b.awarded_at.as_str()), Some(EPOCH_AWARDED_AT));
    }

    #[test]
    fn team_members_are_deduplicated() {
        let doc = root(&json!({
            "teams": [{ "id": "t1", "name": "Owls", "memberIds": ["s1", "s2", "s1", 5, ""] }]
        }));
        let mut repairs = Repairs::default();
        let list = teams(&doc, &mut repairs);
        let members: Vec<&str> = list
            .first()
            .map(|t| t.member_ids.iter().map(StudentId::as_str).collect())
            .unwrap_or_default();
        assert_eq!(members, ["s1", "s2"]);
    }

    #[test]
    fn logs_need_student_and_quest() {
        let doc = root(&json!({
            "logs": [
                { "id": "l1", "studentId": "s1", "questId": "q1", "xp": 10, "timestamp": 5 },
                { "id": "l2", "studentId": "s1", "xp": 10 },
                { "id": "l3", "questId": "q1" },
                { "id": "l4", "studentId": "gone", "questId": "q1", "timestamp": -20 }
            ]
        }));
        let mut repairs = Repairs::default();
        let list = logs(&doc, 1_700_000_000_000, &mut repairs);

        let ids: Vec<&str> = list.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l1", "l4"]);
        assert_eq!(list.get(1).map(|l| l.timestamp), Some(0));
        assert_eq!(list.get(1).map(|l| l.quest_name.as_str()), Some("Unknown"));
    }

    #[test]
    fn missing_log_timestamp_uses_now() {
        let doc = root(&json!({
            "logs": [{ "id": "l1", "studentId": "s1", "questId": "q1" }]
        }));
        let mut repairs = Repairs::default();
        let list = logs(&doc, 42, &mut repairs);
        assert_eq!(list.first().map(|l| l.timestamp), Some(42));
    }

    #[test]
    fn quests_default_type_and_target() {
        let doc = root(&json!({
            "quests": [{ "id": "q1", "name": "Read", "xp": "15", "type": "weekly" }]
        }));
        let mut repairs = Repairs::default();
        let list = quests(&doc, &mut repairs);
        let quest = list.first().cloned();
        assert_eq!(quest.as_ref().map(|q| q.quest_type), Some(QuestType::Daily));
        assert_eq!(quest.as_ref().map(|q| q.target), Some(QuestTarget::Individual));
        assert_eq!(quest.as_ref().map(|q| q.xp), Some(15));
        assert_eq!(quest.as_ref().map(|q| q.active), Some(true));
    }

    #[test]
    fn badge_rules_need_a_category_reference() {
        let doc = root(&json!({
            "badgeDefs": [
                { "id": "d1", "name": "Reader", "rule": { "type": "category_xp", "threshold": 50 } },
                { "id": "d2", "name": "Hero", "rule": { "type": "total_xp", "threshold": "100" } },
                { "id": "d3", "name": "Maths", "rule": { "type": "category_xp", "category": "Maths", "threshold": -3 } }
            ]
        }));
        let mut repairs = Repairs::default();
        let list = badge_defs(&doc, &mut repairs);

        assert_eq!(list.first().and_then(|d| d.rule.clone()), None);
        assert_eq!(
            list.get(1).and_then(|d| d.rule.clone()),
            Some(BadgeRule::TotalXp { threshold: 100 })
        );
        assert_eq!(
            list.get(2).and_then(|d| d.rule.clone()),
            Some(BadgeRule::CategoryXp {
                category_id: None,
                category: Some("Maths".to_owned()),
                threshold: 0,
            })
        );
    }
}
