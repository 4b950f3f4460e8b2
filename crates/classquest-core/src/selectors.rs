//! Read-only queries over a document.

use std::collections::HashSet;

use classquest_progress::{ClassProgress, compute_class_progress, normalize_milestone_step};
use classquest_types::{AVATAR_STAGE_COUNT, AppState, LogEntry, Student};

/// Default number of log entries returned by [`logs_for_student`].
pub const DEFAULT_LOG_LIMIT: usize = 25;

/// The student with the given id.
pub fn student_by_id<'a>(state: &'a AppState, id: &str) -> Option<&'a Student> {
    if id.is_empty() {
        return None;
    }
    state.students.iter().find(|s| s.id.as_str() == id)
}

/// Up to `limit` log entries for a student, in document order.
pub fn logs_for_student<'a>(
    state: &'a AppState,
    student_id: &str,
    limit: usize,
) -> Vec<&'a LogEntry> {
    if student_id.is_empty() {
        return Vec::new();
    }
    state
        .logs
        .iter()
        .filter(|entry| entry.student_id.as_str() == student_id)
        .take(limit)
        .collect()
}

/// Log entries whose student no longer exists.
///
/// They are kept in the document for history; views that join logs with
/// students should skip them.
pub fn orphaned_logs(state: &AppState) -> Vec<&LogEntry> {
    let known: HashSet<&str> = state.students.iter().map(|s| s.id.as_str()).collect();
    state
        .logs
        .iter()
        .filter(|entry| !known.contains(entry.student_id.as_str()))
        .collect()
}

/// Class progress computed from the students' XP.
///
/// The stored cache is ignored; the students are the source of truth.
pub fn class_progress(state: &AppState) -> ClassProgress {
    let step = normalize_milestone_step(Some(i64::from(state.settings.class_milestone_step)));
    compute_class_progress(state.students.iter().map(|s| s.xp), step)
}

/// Avatar stage (`0..AVATAR_STAGE_COUNT`) for a level.
///
/// The stage is the number of leading thresholds the level has reached.
/// Levels below 1 count as 1.
pub fn avatar_stage_index(level: u32, thresholds: &[u32]) -> usize {
    let level = level.max(1);
    let reached = thresholds.iter().take_while(|&&t| level >= t).count();
    reached.min(AVATAR_STAGE_COUNT.saturating_sub(1))
}

/// Blob key of a student's avatar for their current level, if they have an
/// image for that stage.
pub fn avatar_key_for<'a>(state: &AppState, student: &'a Student) -> Option<&'a str> {
    let stage = avatar_stage_index(student.level, &state.settings.avatar_stage_thresholds);
    student.avatar_key(stage)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use classquest_types::{LogEntryId, QuestId, Settings, StudentId};

    use super::*;

    fn log(id: &str, student: &str) -> LogEntry {
        LogEntry {
            id: LogEntryId::from(id),
            timestamp: 0,
            student_id: StudentId::from(student),
            quest_id: QuestId::from("q"),
            quest_name: "Quest".to_owned(),
            xp: 10,
            note: None,
            quest_category: None,
            quest_category_id: None,
        }
    }

    fn classroom() -> AppState {
        let mut state = AppState::empty(4, Settings::default());
        let mut ada = Student::new(StudentId::from("ada"), "Ada");
        ada.xp = 700;
        let mut ben = Student::new(StudentId::from("ben"), "Ben");
        ben.xp = 450;
        state.students = vec![ada, ben];
        state.logs = vec![
            log("l1", "ada"),
            log("l2", "gone"),
            log("l3", "ada"),
            log("l4", "ben"),
            log("l5", "ada"),
        ];
        state
    }

    #[test]
    fn finds_students_by_id() {
        let state = classroom();
        assert_eq!(student_by_id(&state, "ben").map(|s| s.alias.as_str()), Some("Ben"));
        assert!(student_by_id(&state, "nobody").is_none());
        assert!(student_by_id(&state, "").is_none());
    }

    #[test]
    fn student_logs_respect_limit_and_order() {
        let state = classroom();
        let ids: Vec<&str> = logs_for_student(&state, "ada", 2)
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, ["l1", "l3"]);
        assert_eq!(logs_for_student(&state, "ada", DEFAULT_LOG_LIMIT).len(), 3);
        assert!(logs_for_student(&state, "ada", 0).is_empty());
        assert!(logs_for_student(&state, "", 5).is_empty());
    }

    #[test]
    fn orphaned_logs_point_at_missing_students() {
        let state = classroom();
        let orphans = orphaned_logs(&state);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id.as_str(), "l2");
    }

    #[test]
    fn class_progress_uses_student_xp() {
        let mut state = classroom();
        state.settings.class_milestone_step = 500;
        let progress = class_progress(&state);
        assert_eq!(progress.total_xp, 1150);
        assert_eq!(progress.stars, 2);
        assert_eq!(progress.remaining_xp, 350);
    }

    #[test]
    fn avatar_stage_follows_thresholds() {
        let thresholds = [5, 10];
        assert_eq!(avatar_stage_index(0, &thresholds), 0);
        assert_eq!(avatar_stage_index(4, &thresholds), 0);
        assert_eq!(avatar_stage_index(5, &thresholds), 1);
        assert_eq!(avatar_stage_index(9, &thresholds), 1);
        assert_eq!(avatar_stage_index(10, &thresholds), 2);
        assert_eq!(avatar_stage_index(99, &[1, 2, 3, 4]), 2);
        assert_eq!(avatar_stage_index(3, &[]), 0);
    }

    #[test]
    fn avatar_key_matches_stage() {
        let mut state = classroom();
        state.students[0].level = 6;
        state.students[0].avatar_pack.stage_keys =
            vec![Some("egg".to_owned()), Some("chick".to_owned()), None];
        assert_eq!(avatar_key_for(&state, &state.students[0]), Some("chick"));
        state.students[0].level = 12;
        assert_eq!(avatar_key_for(&state, &state.students[0]), None);
    }
}
