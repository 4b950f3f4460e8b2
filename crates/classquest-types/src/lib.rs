//! Shared document types for the ClassQuest classroom state.
//!
//! This crate is the single source of truth for the shape of the persisted
//! classroom document. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the classroom UI.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe string wrappers for all entity identifiers
//! - [`enums`] -- Quest, avatar, theme, and asset enumerations
//! - [`structs`] -- The [`AppState`] aggregate and its entities

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AssetKind, AvatarMode, QuestTarget, QuestType, Theme};
pub use ids::{BadgeId, CategoryId, LogEntryId, QuestId, StudentId, TeamId};
pub use structs::{
    AVATAR_STAGE_COUNT, AnimationSettings, AppState, AssetBindings, AssetRef, AssetSettings,
    AudioSettings, AvatarPack, Badge, BadgeDefinition, BadgeRule, Category, ClassProgressCache,
    DEFAULT_AVATAR_STAGE_THRESHOLDS, DEFAULT_CLASS_MILESTONE_STEP, DEFAULT_STREAK_THRESHOLD,
    DEFAULT_XP_PER_LEVEL, LogEntry, Quest, Settings, Student, Team,
};
