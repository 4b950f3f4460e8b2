//! Core document structs for the classroom state.
//!
//! Field names serialize in camelCase to match the persisted JSON document.
//! These types describe the *canonical* shape; untrusted input never
//! deserializes into them directly but goes through the sanitizer in
//! `classquest-schema`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AssetKind, AvatarMode, QuestTarget, QuestType, Theme};
use crate::ids::{BadgeId, CategoryId, LogEntryId, QuestId, StudentId, TeamId};

/// Number of avatar stages a student progresses through.
pub const AVATAR_STAGE_COUNT: usize = 3;

/// Default XP needed per student level.
pub const DEFAULT_XP_PER_LEVEL: u32 = 100;

/// Default class-wide XP between two stars.
pub const DEFAULT_CLASS_MILESTONE_STEP: u32 = 1000;

/// Default streak length that earns a streak badge.
pub const DEFAULT_STREAK_THRESHOLD: u32 = 5;

/// Default level thresholds for avatar stages two and three.
pub const DEFAULT_AVATAR_STAGE_THRESHOLDS: [u32; 2] = [5, 10];

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The aggregate root: one classroom document.
///
/// Constructed once per load by the sanitize-then-migrate pipeline and
/// replaced wholesale on import or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AppState {
    /// Schema version of this document. Only ever increases.
    pub version: u32,
    /// Students in display order. Ids are unique.
    pub students: Vec<Student>,
    /// Teams in display order.
    pub teams: Vec<Team>,
    /// Quests in display order.
    pub quests: Vec<Quest>,
    /// XP log, oldest first.
    pub logs: Vec<LogEntry>,
    /// Class-wide settings.
    pub settings: Settings,
    /// Denormalized class progress, recomputed on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_progress: Option<ClassProgressCache>,
    /// Badge definitions that can be awarded.
    #[serde(default)]
    pub badge_defs: Vec<BadgeDefinition>,
    /// Quest and badge categories.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl AppState {
    /// An empty document at the given version with the given settings.
    pub const fn empty(version: u32, settings: Settings) -> Self {
        Self {
            version,
            students: Vec::new(),
            teams: Vec::new(),
            quests: Vec::new(),
            logs: Vec::new(),
            settings,
            class_progress: None,
            badge_defs: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// Cached class-wide progress stored alongside the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClassProgressCache {
    /// Sum of all student XP, clamped at zero.
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    /// Stars earned so far (`total_xp / step`).
    pub stars: u64,
}

// ---------------------------------------------------------------------------
// Students, teams, quests
// ---------------------------------------------------------------------------

/// A student participating in the class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Student {
    /// Unique student id.
    pub id: StudentId,
    /// Display name shown in the classroom.
    pub alias: String,
    /// Cumulative XP.
    pub xp: i64,
    /// Level derived from `xp` and the class XP-per-level setting.
    pub level: u32,
    /// Current streak length per quest.
    #[serde(default)]
    pub streaks: BTreeMap<String, u32>,
    /// Last day (`YYYY-MM-DD`) each quest was awarded.
    #[serde(default)]
    pub last_awarded_day: BTreeMap<String, String>,
    /// Badges awarded to this student.
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Team the student belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// How the avatar is rendered.
    #[serde(default)]
    pub avatar_mode: AvatarMode,
    /// Uploaded avatar images, one blob key per stage.
    #[serde(default)]
    pub avatar_pack: AvatarPack,
}

impl Student {
    /// Create a student with no XP at level 1.
    pub fn new(id: StudentId, alias: impl Into<String>) -> Self {
        Self {
            id,
            alias: alias.into(),
            xp: 0,
            level: 1,
            streaks: BTreeMap::new(),
            last_awarded_day: BTreeMap::new(),
            badges: Vec::new(),
            team_id: None,
            avatar_mode: AvatarMode::Procedural,
            avatar_pack: AvatarPack::default(),
        }
    }

    /// Blob store key of the avatar image for the given stage, if any.
    pub fn avatar_key(&self, stage: usize) -> Option<&str> {
        self.avatar_pack
            .stage_keys
            .get(stage)
            .and_then(|key| key.as_deref())
    }
}

/// Per-stage avatar image keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AvatarPack {
    /// Exactly [`AVATAR_STAGE_COUNT`] entries; `None` means no image.
    pub stage_keys: Vec<Option<String>>,
}

impl Default for AvatarPack {
    fn default() -> Self {
        Self {
            stage_keys: vec![None; AVATAR_STAGE_COUNT],
        }
    }
}

/// A badge awarded to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Badge {
    /// Badge id (matches a [`BadgeDefinition`] when awarded by rule).
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// Blob store key of the badge icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC 3339 timestamp of the award.
    pub awarded_at: String,
}

/// A named group of students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Team {
    /// Unique team id.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Member student ids, without duplicates.
    #[serde(default)]
    pub member_ids: Vec<StudentId>,
}

/// A task that awards (or, when negative, deducts) XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Quest {
    /// Unique quest id.
    pub id: QuestId,
    /// Display name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// XP awarded per completion.
    pub xp: i64,
    /// Repetition rule.
    #[serde(rename = "type")]
    pub quest_type: QuestType,
    /// Individual or team quest.
    pub target: QuestTarget,
    /// Restricts the quest to a single student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_personal_to: Option<StudentId>,
    /// Inactive quests are hidden from the award panel.
    pub active: bool,
    /// Legacy free-text category name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Category reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

/// One XP award (or deduction) in the class log.
///
/// `student_id` is a soft reference: entries for deleted students are kept
/// for audit and filtered out of per-student views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// Unique entry id.
    pub id: LogEntryId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Student that received the XP.
    pub student_id: StudentId,
    /// Quest that was awarded.
    pub quest_id: QuestId,
    /// Quest name at the time of the award.
    pub quest_name: String,
    /// XP delta; negative for deductions.
    pub xp: i64,
    /// Free-text note attached to the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Quest category name at the time of the award.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_category: Option<String>,
    /// Quest category id at the time of the award.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_category_id: Option<CategoryId>,
}

// ---------------------------------------------------------------------------
// Badge definitions and categories
// ---------------------------------------------------------------------------

/// Automatic award rule attached to a badge definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BadgeRule {
    /// Awarded once a student's XP within a category reaches `threshold`.
    CategoryXp {
        /// Category reference.
        #[serde(rename = "categoryId", default)]
        category_id: Option<CategoryId>,
        /// Legacy category name.
        #[serde(default)]
        category: Option<String>,
        /// XP required.
        threshold: u32,
    },
    /// Awarded once a student's total XP reaches `threshold`.
    TotalXp {
        /// XP required.
        threshold: u32,
    },
}

/// A badge that can be awarded to students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BadgeDefinition {
    /// Unique definition id.
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Legacy free-text category name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Category reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Blob store key of the badge icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
    /// Automatic award rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<BadgeRule>,
}

/// A quest/badge category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Category {
    /// Unique category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// CSS color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Class-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Settings {
    /// Class display name.
    pub class_name: String,
    /// XP per student level. Always at least 1.
    pub xp_per_level: u32,
    /// Streak length that earns a streak badge. Always at least 1.
    pub streak_threshold_for_badge: u32,
    /// Whether student XP may go below zero.
    #[serde(rename = "allowNegativeXP")]
    pub allow_negative_xp: bool,
    /// Sound effects toggle.
    pub sfx_enabled: bool,
    /// Compact list layout.
    pub compact_mode: bool,
    /// Keyboard shortcuts toggle.
    pub shortcuts_enabled: bool,
    /// Whether the first-run walkthrough was completed.
    pub onboarding_completed: bool,
    /// Animation toggle.
    pub animations_enabled: bool,
    /// Simplified kid-facing mode.
    pub kid_mode_enabled: bool,
    /// UI theme.
    pub theme: Theme,
    /// Feature flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<BTreeMap<String, bool>>,
    /// Blob store key of the custom star icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_star_icon_key: Option<String>,
    /// Class-wide XP between two stars. Always at least 1.
    pub class_milestone_step: u32,
    /// Display name for stars.
    pub class_stars_name: String,
    /// Levels at which avatar stages two and three begin; strictly increasing.
    pub avatar_stage_thresholds: [u32; 2],
    /// Asset library and event bindings.
    #[serde(default)]
    pub assets: AssetSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            class_name: "My Class".to_owned(),
            xp_per_level: DEFAULT_XP_PER_LEVEL,
            streak_threshold_for_badge: DEFAULT_STREAK_THRESHOLD,
            allow_negative_xp: false,
            sfx_enabled: false,
            compact_mode: false,
            shortcuts_enabled: true,
            onboarding_completed: false,
            animations_enabled: true,
            kid_mode_enabled: false,
            theme: Theme::System,
            flags: None,
            class_star_icon_key: None,
            class_milestone_step: DEFAULT_CLASS_MILESTONE_STEP,
            class_stars_name: "Stars".to_owned(),
            avatar_stage_thresholds: DEFAULT_AVATAR_STAGE_THRESHOLDS,
            assets: AssetSettings::default(),
        }
    }
}

/// Uploaded assets and which app events they are bound to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AssetSettings {
    /// Uploaded assets by library id.
    #[serde(default)]
    pub library: BTreeMap<String, AssetRef>,
    /// Event-to-asset bindings per asset kind.
    #[serde(default)]
    pub bindings: AssetBindings,
    /// Sound output settings.
    #[serde(default)]
    pub audio: AudioSettings,
    /// Animation preferences.
    #[serde(default)]
    pub animations: AnimationSettings,
}

/// An uploaded asset. The bytes live in the blob store under `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AssetRef {
    /// Blob store key.
    pub key: String,
    /// Asset kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// Display name.
    pub name: String,
    /// Upload time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Event name to library id, per asset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AssetBindings {
    /// Sound bindings.
    #[serde(default)]
    pub audio: BTreeMap<String, String>,
    /// Animation bindings.
    #[serde(default)]
    pub lottie: BTreeMap<String, String>,
    /// Image bindings.
    #[serde(default)]
    pub image: BTreeMap<String, String>,
}

/// Sound output settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AudioSettings {
    /// Master volume in `0.0..=1.0`.
    pub master_volume: f64,
    /// Whether bound sounds play.
    pub enabled: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            enabled: true,
        }
    }
}

/// Animation preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AnimationSettings {
    /// Whether bound animations play.
    pub enabled: bool,
    /// Replace motion with fades.
    pub prefer_reduced_motion: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_reduced_motion: false,
        }
    }
}
