//! Forward-only document migrations.
//!
//! The chain is a static table of [`Migration`]s, one per version step, and
//! [`migrate`] folds a document through every step from its stored version
//! to [`CURRENT_VERSION`]. Each step is a pure function of the whole state.
//!
//! | Step | Change |
//! |------|--------|
//! | 1 -> 2 | `level` becomes derived from `xp` and `xpPerLevel` |
//! | 2 -> 3 | Legacy category names resolve to `categoryId`s |
//! | 3 -> 4 | Team membership lives on `team.memberIds` |

use std::collections::{HashMap, HashSet};

use classquest_progress::{DEFAULT_MILESTONE_STEP, DEFAULT_XP_PER_LEVEL, level_for_xp};
use classquest_types::{AppState, BadgeRule, Category, CategoryId, StudentId, TeamId};

use crate::error::MigrationError;

/// Version written by this build.
pub const CURRENT_VERSION: u32 = 4;

/// One version step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version the step starts from; it produces `from + 1`.
    pub from: u32,
    /// Short summary for logs.
    pub description: &'static str,
    /// The transform.
    pub apply: fn(AppState) -> AppState,
}

/// Every step, ordered by `from`.
pub const MIGRATIONS: [Migration; 3] = [
    Migration {
        from: 1,
        description: "derive student levels from XP",
        apply: derive_levels,
    },
    Migration {
        from: 2,
        description: "resolve legacy category names to ids",
        apply: resolve_categories,
    },
    Migration {
        from: 3,
        description: "move team membership onto teams",
        apply: normalize_team_membership,
    },
];

/// Bring `state` to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns [`MigrationError::FutureVersion`] if the document is newer than
/// this build; nothing is applied in that case.
pub fn migrate(state: AppState) -> Result<AppState, MigrationError> {
    migrate_to(state, CURRENT_VERSION)
}

/// Bring `state` to `target`, applying only the steps below it.
///
/// A document already at or past `target` is returned unchanged; versions
/// never decrease.
///
/// # Errors
///
/// Returns [`MigrationError::FutureVersion`] if the document is newer than
/// this build, and [`MigrationError::UnknownTarget`] if `target` is.
pub fn migrate_to(mut state: AppState, target: u32) -> Result<AppState, MigrationError> {
    if state.version > CURRENT_VERSION {
        return Err(MigrationError::FutureVersion {
            found: state.version,
            supported: CURRENT_VERSION,
        });
    }
    if target > CURRENT_VERSION {
        return Err(MigrationError::UnknownTarget {
            target,
            supported: CURRENT_VERSION,
        });
    }
    let start = state.version;
    for step in MIGRATIONS
        .iter()
        .filter(|m| m.from >= start && m.from < target)
    {
        state = (step.apply)(state);
        state.version = step.from.saturating_add(1);
        tracing::info!(
            from = step.from,
            to = state.version,
            description = step.description,
            "Applied document migration"
        );
    }
    Ok(state)
}

/// Replace settings the transforms divide by when they are zero.
fn guard_divisors(state: &mut AppState) {
    if state.settings.xp_per_level == 0 {
        tracing::warn!(
            default = DEFAULT_XP_PER_LEVEL.get(),
            "xpPerLevel is zero, substituting default"
        );
        state.settings.xp_per_level = DEFAULT_XP_PER_LEVEL.get();
    }
    if state.settings.class_milestone_step == 0 {
        let default = u32::try_from(DEFAULT_MILESTONE_STEP.get()).unwrap_or(u32::MAX);
        tracing::warn!(default, "classMilestoneStep is zero, substituting default");
        state.settings.class_milestone_step = default;
    }
}

// =============================================================================
// 1 -> 2
// =============================================================================

fn derive_levels(mut state: AppState) -> AppState {
    guard_divisors(&mut state);
    let per_level =
        std::num::NonZeroU32::new(state.settings.xp_per_level).unwrap_or(DEFAULT_XP_PER_LEVEL);
    for student in &mut state.students {
        student.level = level_for_xp(student.xp, per_level);
    }
    state
}

// =============================================================================
// 2 -> 3
// =============================================================================

const FALLBACK_CATEGORY_NAME: &str = "Category";
const UNCATEGORIZED: &str = "uncategorized";

/// Category lookup by id and by case-insensitive name, creating entries on
/// demand. Existing categories keep their order; created ones append.
struct CategoryIndex {
    categories: Vec<Category>,
    ids: HashSet<CategoryId>,
    by_name: HashMap<String, CategoryId>,
}

impl CategoryIndex {
    fn new(existing: Vec<Category>) -> Self {
        let mut index = Self {
            categories: Vec::with_capacity(existing.len()),
            ids: HashSet::new(),
            by_name: HashMap::new(),
        };
        for category in existing {
            index.register(category);
        }
        index
    }

    fn register(&mut self, mut category: Category) {
        if self.ids.contains(&category.id) {
            return;
        }
        let trimmed = category.name.trim();
        category.name = if trimmed.is_empty() {
            FALLBACK_CATEGORY_NAME.to_owned()
        } else {
            trimmed.to_owned()
        };
        self.by_name
            .entry(category.name.to_lowercase())
            .or_insert_with(|| category.id.clone());
        self.ids.insert(category.id.clone());
        self.categories.push(category);
    }

    /// Keep a referenced id, creating its category when unknown.
    fn ensure_id(&mut self, id: &CategoryId, fallback_name: Option<&str>) -> CategoryId {
        if !self.ids.contains(id) {
            self.register(Category {
                id: id.clone(),
                name: fallback_name.unwrap_or(FALLBACK_CATEGORY_NAME).to_owned(),
                color: None,
            });
        }
        id.clone()
    }

    /// Find a category by name, creating it when none matches.
    fn ensure_name(&mut self, name: &str) -> Option<CategoryId> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(id) = self.by_name.get(&trimmed.to_lowercase()) {
            return Some(id.clone());
        }
        let id = self.id_for_name(trimmed);
        self.register(Category {
            id: id.clone(),
            name: trimmed.to_owned(),
            color: None,
        });
        Some(id)
    }

    /// `cat-<slug>` of the name, suffixed until unused. Same input, same id.
    fn id_for_name(&self, name: &str) -> CategoryId {
        let mut slug = String::with_capacity(name.len());
        for c in name.to_lowercase().chars() {
            if c.is_alphanumeric() {
                slug.push(c);
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');
        let base = if slug.is_empty() {
            format!("cat-{UNCATEGORIZED}")
        } else {
            format!("cat-{slug}")
        };
        let mut candidate = CategoryId::from(base.as_str());
        let mut n: u32 = 2;
        while self.ids.contains(&candidate) {
            candidate = CategoryId::from(format!("{base}-{n}").as_str());
            n = n.saturating_add(1);
        }
        candidate
    }

    /// Resolve an `(id, legacy name)` pair to an id.
    fn resolve(&mut self, id: Option<&CategoryId>, name: Option<&str>) -> Option<CategoryId> {
        match id {
            Some(id) => Some(self.ensure_id(id, name)),
            None => name.and_then(|name| self.ensure_name(name)),
        }
    }
}

fn resolve_categories(mut state: AppState) -> AppState {
    let before = state.categories.len();
    let mut index = CategoryIndex::new(std::mem::take(&mut state.categories));

    for quest in &mut state.quests {
        quest.category_id = index.resolve(quest.category_id.as_ref(), quest.category.as_deref());
    }

    for definition in &mut state.badge_defs {
        definition.category_id =
            index.resolve(definition.category_id.as_ref(), definition.category.as_deref());
        if let Some(BadgeRule::CategoryXp {
            category_id,
            category,
            ..
        }) = &mut definition.rule
        {
            let name = category
                .clone()
                .or_else(|| definition.category.clone())
                .unwrap_or_else(|| UNCATEGORIZED.to_owned());
            *category_id = index.resolve(category_id.as_ref(), Some(&name));
            *category = Some(name);
        }
    }

    let created = index.categories.len().saturating_sub(before);
    if created > 0 {
        tracing::debug!(created, "Created categories for legacy names");
    }
    state.categories = index.categories;
    state
}

// =============================================================================
// 3 -> 4
// =============================================================================

fn normalize_team_membership(mut state: AppState) -> AppState {
    let known: HashSet<StudentId> = state.students.iter().map(|s| s.id.clone()).collect();
    let team_ids: HashSet<TeamId> = state.teams.iter().map(|t| t.id.clone()).collect();

    for team in &mut state.teams {
        team.member_ids.retain(|id| known.contains(id));
    }

    for student in &state.students {
        let Some(team_id) = student.team_id.as_ref().filter(|id| team_ids.contains(*id)) else {
            continue;
        };
        if let Some(team) = state.teams.iter_mut().find(|t| &t.id == team_id) {
            if !team.member_ids.contains(&student.id) {
                team.member_ids.push(student.id.clone());
            }
        }
    }

    let mut first_team: HashMap<StudentId, TeamId> = HashMap::new();
    for team in &state.teams {
        for member in &team.member_ids {
            first_team
                .entry(member.clone())
                .or_insert_with(|| team.id.clone());
        }
    }
    for student in &mut state.students {
        student.team_id = first_team.get(&student.id).cloned();
    }
    state
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use classquest_types::{BadgeDefinition, BadgeId, Quest, QuestId, Settings, Student, Team};

    use super::*;

    fn state_at(version: u32) -> AppState {
        AppState::empty(version, Settings::default())
    }

    fn student(id: &str, xp: i64) -> Student {
        let mut s = Student::new(StudentId::from(id), id);
        s.xp = xp;
        s
    }

    fn quest(id: &str, category: Option<&str>, category_id: Option<&str>) -> Quest {
        Quest {
            id: QuestId::from(id),
            name: id.to_owned(),
            description: None,
            xp: 10,
            quest_type: classquest_types::QuestType::Daily,
            target: classquest_types::QuestTarget::Individual,
            is_personal_to: None,
            active: true,
            category: category.map(str::to_owned),
            category_id: category_id.map(CategoryId::from),
        }
    }

    #[test]
    fn table_is_contiguous_and_ends_at_current() {
        for (i, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(usize::try_from(step.from).unwrap(), i + 1);
        }
        assert_eq!(MIGRATIONS.last().map(|m| m.from + 1), Some(CURRENT_VERSION));
    }

    #[test]
    fn current_version_is_identity() {
        let mut state = state_at(CURRENT_VERSION);
        state.students.push(student("s1", 250));
        let migrated = migrate(state.clone()).unwrap();
        assert_eq!(migrated, state);
    }

    #[test]
    fn future_version_is_rejected() {
        let err = migrate(state_at(CURRENT_VERSION + 1)).unwrap_err();
        assert_eq!(
            err,
            MigrationError::FutureVersion {
                found: CURRENT_VERSION + 1,
                supported: CURRENT_VERSION
            }
        );
    }

    #[test]
    fn version_only_increases() {
        for start in 1..=CURRENT_VERSION {
            let migrated = migrate(state_at(start)).unwrap();
            assert_eq!(migrated.version, CURRENT_VERSION);
        }
        let held = migrate_to(state_at(3), 2).unwrap();
        assert_eq!(held.version, 3);
    }

    #[test]
    fn levels_are_derived_from_xp() {
        let mut state = state_at(1);
        state.settings.xp_per_level = 100;
        state.students = vec![student("a", 0), student("b", 250), student("c", -40)];
        state.students.iter_mut().for_each(|s| s.level = 42);

        let migrated = migrate_to(state, 2).unwrap();
        let levels: Vec<u32> = migrated.students.iter().map(|s| s.level).collect();
        assert_eq!(levels, [1, 3, 1]);
        assert_eq!(migrated.version, 2);
    }

    #[test]
    fn zero_divisors_are_replaced() {
        let mut state = state_at(1);
        state.settings.xp_per_level = 0;
        state.settings.class_milestone_step = 0;
        state.students = vec![student("a", 150)];

        let migrated = migrate_to(state, 2).unwrap();
        assert_eq!(migrated.settings.xp_per_level, 100);
        assert_eq!(migrated.settings.class_milestone_step, 1000);
        assert_eq!(migrated.students.first().map(|s| s.level), Some(2));
    }

    #[test]
    fn legacy_category_names_resolve_case_insensitively() {
        let mut state = state_at(2);
        state.categories = vec![Category {
            id: CategoryId::from("c-math"),
            name: "Maths".to_owned(),
            color: Some("#f00".to_owned()),
        }];
        state.quests = vec![
            quest("q1", Some("maths"), None),
            quest("q2", Some("Reading"), None),
            quest("q3", Some("reading "), None),
            quest("q4", None, Some("c-art")),
            quest("q5", None, None),
        ];

        let migrated = migrate_to(state, 3).unwrap();
        let ids: Vec<Option<&str>> = migrated
            .quests
            .iter()
            .map(|q| q.category_id.as_ref().map(CategoryId::as_str))
            .collect();

        assert_eq!(ids.first().copied().flatten(), Some("c-math"));
        assert!(ids.get(1).copied().flatten().is_some());
        assert_eq!(ids.get(1), ids.get(2));
        assert_eq!(ids.get(3).copied().flatten(), Some("c-art"));
        assert_eq!(ids.get(4).copied().flatten(), None);

        let names: Vec<&str> = migrated.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Maths", "Reading", "Category"]);
        assert_eq!(migrated.quests.first().and_then(|q| q.category.as_deref()), Some("maths"));
    }

    #[test]
    fn created_category_ids_are_stable() {
        let mut state = state_at(2);
        state.categories = vec![Category {
            id: CategoryId::from("cat-reading"),
            name: "Library".to_owned(),
            color: None,
        }];
        state.quests = vec![
            quest("q1", Some("Reading"), None),
            quest("q2", Some("  Arts & Crafts "), None),
        ];

        let once = migrate(state.clone()).unwrap();
        let twice = migrate(state).unwrap();
        assert_eq!(once, twice);

        let ids: Vec<Option<&str>> = once
            .quests
            .iter()
            .map(|q| q.category_id.as_ref().map(CategoryId::as_str))
            .collect();
        assert_eq!(ids, [Some("cat-reading-2"), Some("cat-arts-crafts")]);
    }

    #[test]
    fn category_rules_gain_ids() {
        let mut state = state_at(2);
        state.badge_defs = vec![BadgeDefinition {
            id: BadgeId::from("d1"),
            name: "Scientist".to_owned(),
            description: None,
            category: Some("Science".to_owned()),
            category_id: None,
            icon_key: None,
            rule: Some(BadgeRule::CategoryXp {
                category_id: None,
                category: None,
                threshold: 100,
            }),
        }];

        let migrated = migrate_to(state, 3).unwrap();
        let def = migrated.badge_defs.first().unwrap();
        assert!(def.category_id.is_some());
        assert_eq!(
            def.rule,
            Some(BadgeRule::CategoryXp {
                category_id: def.category_id.clone(),
                category: Some("Science".to_owned()),
                threshold: 100,
            })
        );
        assert_eq!(migrated.categories.len(), 1);
    }

    #[test]
    fn team_membership_moves_onto_teams() {
        let mut state = state_at(3);
        let mut a = student("a", 0);
        a.team_id = Some(TeamId::from("t1"));
        let mut b = student("b", 0);
        b.team_id = Some(TeamId::from("missing"));
        let c = student("c", 0);
        state.students = vec![a, b, c];
        state.teams = vec![
            Team {
                id: TeamId::from("t1"),
                name: "Owls".to_owned(),
                member_ids: vec![StudentId::from("ghost")],
            },
            Team {
                id: TeamId::from("t2"),
                name: "Foxes".to_owned(),
                member_ids: vec![StudentId::from("c"), StudentId::from("a")],
            },
        ];

        let migrated = migrate_to(state, 4).unwrap();
        let members = |i: usize| -> Vec<&str> {
            migrated
                .teams
                .get(i)
                .map(|t| t.member_ids.iter().map(StudentId::as_str).collect())
                .unwrap_or_default()
        };
        assert_eq!(members(0), ["a"]);
        assert_eq!(members(1), ["c", "a"]);

        let team_of: Vec<Option<&str>> = migrated
            .students
            .iter()
            .map(|s| s.team_id.as_ref().map(TeamId::as_str))
            .collect();
        assert_eq!(team_of, [Some("t1"), None, Some("t2")]);
    }
}
