//! Enumeration types stored in the classroom document.
//!
//! Every enum serializes to the lowercase string form used by the persisted
//! JSON document, and offers a lenient `parse` used when repairing
//! untrusted input.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// How often a quest can be awarded to the same student.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum QuestType {
    /// Once per student per calendar day.
    #[default]
    Daily,
    /// Any number of times.
    Repeatable,
    /// Once per student, ever.
    Oneoff,
}

impl QuestType {
    /// Parse the persisted string form. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "repeatable" => Some(Self::Repeatable),
            "oneoff" => Some(Self::Oneoff),
            _ => None,
        }
    }
}

/// Who receives the XP when a quest is awarded.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum QuestTarget {
    /// A single student.
    #[default]
    Individual,
    /// Every member of a team.
    Team,
}

impl QuestTarget {
    /// Parse the persisted string form. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "team" => Some(Self::Team),
            _ => None,
        }
    }
}

/// How a student's avatar is rendered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum AvatarMode {
    /// Generated from the student's alias; no stored images.
    #[default]
    Procedural,
    /// One uploaded image per avatar stage, stored in the blob store.
    ImagePack,
}

impl AvatarMode {
    /// Parse the persisted string form. Anything but `imagePack` is procedural.
    pub fn parse(value: &str) -> Self {
        if value == "imagePack" {
            Self::ImagePack
        } else {
            Self::Procedural
        }
    }
}

/// UI theme selection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Theme {
    /// Follow the operating system preference.
    #[default]
    System,
    /// Light palette.
    Light,
    /// Dark palette.
    Dark,
    /// Dark palette with the space backdrop.
    Space,
}

impl Theme {
    /// Parse the persisted string form (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "space" => Some(Self::Space),
            _ => None,
        }
    }
}

/// Kind of binary asset referenced from the asset library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AssetKind {
    /// Sound effect.
    Audio,
    /// Lottie animation JSON.
    Lottie,
    /// Raster or vector image.
    Image,
}

impl AssetKind {
    /// Parse the persisted string form. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "audio" => Some(Self::Audio),
            "lottie" => Some(Self::Lottie),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quest_type_round_trips_through_wire_names() {
        for (name, ty) in [
            ("daily", QuestType::Daily),
            ("repeatable", QuestType::Repeatable),
            ("oneoff", QuestType::Oneoff),
        ] {
            assert_eq!(QuestType::parse(name), Some(ty));
            let json = serde_json::to_string(&ty).unwrap_or_default();
            assert_eq!(json, format!("\"{name}\""));
        }
        assert_eq!(QuestType::parse("weekly"), None);
    }

    #[test]
    fn avatar_mode_defaults_to_procedural() {
        assert_eq!(AvatarMode::parse("imagePack"), AvatarMode::ImagePack);
        assert_eq!(AvatarMode::parse("pixel"), AvatarMode::Procedural);
        let json = serde_json::to_string(&AvatarMode::ImagePack).unwrap_or_default();
        assert_eq!(json, "\"imagePack\"");
    }

    #[test]
    fn theme_parse_is_case_insensitive() {
        assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("neon"), None);
    }
}
