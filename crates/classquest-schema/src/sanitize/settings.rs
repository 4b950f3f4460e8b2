//! Settings sanitation, including the asset library and avatar stages.

use std::collections::BTreeMap;

use classquest_types::{
    AnimationSettings, AssetBindings, AssetKind, AssetRef, AssetSettings, AudioSettings,
    DEFAULT_AVATAR_STAGE_THRESHOLDS, DEFAULT_CLASS_MILESTONE_STEP, DEFAULT_STREAK_THRESHOLD,
    DEFAULT_XP_PER_LEVEL, Settings, Theme,
};
use serde_json::{Map, Value};

use super::coerce::{Read, Repairs, boolean, index, integer, join, text};
use crate::repair::RepairKind;

const UNNAMED_ASSET: &str = "Asset";

pub(crate) fn settings(root: &Map<String, Value>, now_ms: i64, repairs: &mut Repairs) -> Settings {
    let defaults = Settings::default();
    let Some(obj) = repairs.object(root, "settings", "") else {
        if root.get("settings").is_none() {
            repairs.note("settings", RepairKind::Defaulted);
        }
        return defaults;
    };
    let path = "settings";

    Settings {
        class_name: repairs.text_or(obj, "className", path, &defaults.class_name),
        xp_per_level: repairs.positive_u32(obj, "xpPerLevel", path, DEFAULT_XP_PER_LEVEL),
        streak_threshold_for_badge: repairs.positive_u32(
            obj,
            "streakThresholdForBadge",
            path,
            DEFAULT_STREAK_THRESHOLD,
        ),
        allow_negative_xp: repairs.flag_or(
            obj,
            "allowNegativeXP",
            path,
            defaults.allow_negative_xp,
        ),
        sfx_enabled: repairs.flag_or(obj, "sfxEnabled", path, defaults.sfx_enabled),
        compact_mode: repairs.flag_or(obj, "compactMode", path, defaults.compact_mode),
        shortcuts_enabled: repairs.flag_or(
            obj,
            "shortcutsEnabled",
            path,
            defaults.shortcuts_enabled,
        ),
        onboarding_completed: repairs.flag_or(
            obj,
            "onboardingCompleted",
            path,
            defaults.onboarding_completed,
        ),
        animations_enabled: repairs.flag_or(
            obj,
            "animationsEnabled",
            path,
            defaults.animations_enabled,
        ),
        kid_mode_enabled: repairs.flag_or(obj, "kidModeEnabled", path, defaults.kid_mode_enabled),
        theme: theme(obj, path, repairs),
        flags: flags(obj, path, repairs),
        class_star_icon_key: repairs.optional_text(obj, "classStarIconKey", path),
        class_milestone_step: repairs.positive_u32(
            obj,
            "classMilestoneStep",
            path,
            DEFAULT_CLASS_MILESTONE_STEP,
        ),
        class_stars_name: repairs.text_or(obj, "classStarsName", path, &defaults.class_stars_name),
        avatar_stage_thresholds: avatar_stage_thresholds(obj, path, repairs),
        assets: assets(obj, path, now_ms, repairs),
    }
}

fn theme(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> Theme {
    let field = join(path, "theme");
    let raw = text(obj.get("theme"));
    let parsed = match &raw {
        Read::Valid(s) | Read::Coerced(s) => Theme::parse(s),
        Read::Missing | Read::Invalid => None,
    };
    match (parsed, raw) {
        (Some(theme), Read::Valid(s)) if s == s.to_ascii_lowercase() => theme,
        (Some(theme), _) => {
            repairs.note(field, RepairKind::Coerced);
            theme
        }
        (None, _) => {
            repairs.note(field, RepairKind::Defaulted);
            Theme::default()
        }
    }
}

/// Boolean feature flags; `None` when nothing usable remains.
fn flags(
    obj: &Map<String, Value>,
    path: &str,
    repairs: &mut Repairs,
) -> Option<BTreeMap<String, bool>> {
    let flags_path = join(path, "flags");
    let raw = repairs.object(obj, "flags", path)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        let trimmed = key.trim();
        match (trimmed.is_empty(), boolean(Some(value))) {
            (false, Read::Valid(flag)) => {
                out.insert(trimmed.to_owned(), flag);
            }
            _ => repairs.note(join(&flags_path, key), RepairKind::Dropped),
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Two strictly increasing levels, each at least 1.
///
/// The second threshold is pushed above the first when it is not already.
pub(crate) fn avatar_stage_thresholds(
    obj: &Map<String, Value>,
    path: &str,
    repairs: &mut Repairs,
) -> [u32; 2] {
    let field = join(path, "avatarStageThresholds");
    let raw: &[Value] = match obj.get("avatarStageThresholds") {
        Some(Value::Array(items)) => items.as_slice(),
        other => {
            if !matches!(other, None | Some(Value::Null)) {
                repairs.note(field.clone(), RepairKind::Defaulted);
            }
            &[]
        }
    };
    let [first_default, second_default] = DEFAULT_AVATAR_STAGE_THRESHOLDS;
    let mut first = threshold(raw.first(), first_default, &index(&field, 0), repairs);
    if first == u32::MAX {
        first = u32::MAX.saturating_sub(1);
        repairs.note(index(&field, 0), RepairKind::Clamped);
    }
    let mut second = threshold(raw.get(1), second_default, &index(&field, 1), repairs);
    if second <= first {
        second = first.saturating_add(1);
        repairs.note(index(&field, 1), RepairKind::Clamped);
    }
    [first, second]
}

fn threshold(value: Option<&Value>, default: u32, path: &str, repairs: &mut Repairs) -> u32 {
    let raw = match integer(value) {
        Read::Valid(n) => n,
        Read::Coerced(n) => {
            repairs.note(path, RepairKind::Coerced);
            n
        }
        Read::Missing | Read::Invalid => {
            repairs.note(path, RepairKind::Defaulted);
            return default;
        }
    };
    let clamped = raw.clamp(1, i64::from(u32::MAX));
    if clamped != raw {
        repairs.note(path, RepairKind::Clamped);
    }
    u32::try_from(clamped).unwrap_or(default)
}

// =============================================================================
// Assets
// =============================================================================

fn assets(
    obj: &Map<String, Value>,
    path: &str,
    now_ms: i64,
    repairs: &mut Repairs,
) -> AssetSettings {
    let Some(raw) = repairs.object(obj, "assets", path) else {
        return AssetSettings::default();
    };
    let path = join(path, "assets");
    let defaults = AssetSettings::default();

    let audio = repairs
        .object(raw, "audio", &path)
        .map_or(defaults.audio, |audio| {
            let audio_path = join(&path, "audio");
            AudioSettings {
                master_volume: repairs.unit_interval(
                    audio,
                    "masterVolume",
                    &audio_path,
                    defaults.audio.master_volume,
                ),
                enabled: repairs.flag_or(audio, "enabled", &audio_path, defaults.audio.enabled),
            }
        });

    let animations = repairs
        .object(raw, "animations", &path)
        .map_or(defaults.animations, |animations| {
            let animations_path = join(&path, "animations");
            AnimationSettings {
                enabled: repairs.flag_or(
                    animations,
                    "enabled",
                    &animations_path,
                    defaults.animations.enabled,
                ),
                prefer_reduced_motion: repairs.flag_or(
                    animations,
                    "preferReducedMotion",
                    &animations_path,
                    defaults.animations.prefer_reduced_motion,
                ),
            }
        });

    AssetSettings {
        library: library(raw, &path, now_ms, repairs),
        bindings: bindings(raw, &path, repairs),
        audio,
        animations,
    }
}

/// Library entries need a non-empty key and a known kind.
fn library(
    obj: &Map<String, Value>,
    path: &str,
    now_ms: i64,
    repairs: &mut Repairs,
) -> BTreeMap<String, AssetRef> {
    let library_path = join(path, "library");
    let Some(raw) = repairs.object(obj, "library", path) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for (id, entry) in raw {
        let entry_path = join(&library_path, id);
        let Value::Object(entry) = entry else {
            repairs.note(entry_path, RepairKind::Dropped);
            continue;
        };
        let key = repairs.id(entry, "key", &entry_path);
        let kind = text(entry.get("type"))
            .value()
            .and_then(|raw| AssetKind::parse(&raw));
        let (Some(key), Some(kind)) = (key, kind) else {
            repairs.note(entry_path, RepairKind::Dropped);
            continue;
        };
        out.insert(
            id.clone(),
            AssetRef {
                key,
                kind,
                name: repairs.text_or(entry, "name", &entry_path, UNNAMED_ASSET),
                created_at: repairs.int_or(entry, "createdAt", &entry_path, now_ms),
            },
        );
    }
    out
}

fn bindings(obj: &Map<String, Value>, path: &str, repairs: &mut Repairs) -> AssetBindings {
    let bindings_path = join(path, "bindings");
    let Some(raw) = repairs.object(obj, "bindings", path) else {
        return AssetBindings::default();
    };
    AssetBindings {
        audio: binding_map(raw, "audio", &bindings_path, repairs),
        lottie: binding_map(raw, "lottie", &bindings_path, repairs),
        image: binding_map(raw, "image", &bindings_path, repairs),
    }
}

/// Event name to asset id; blank or non-text ids are dropped.
fn binding_map(
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
    for (event, asset) in raw {
        let entry_path = join(&map_path, event);
        match text(Some(asset)) {
            Read::Valid(asset) => {
                out.insert(event.clone(), asset);
            }
            Read::Coerced(asset) => {
                repairs.note(entry_path, RepairKind::Coerced);
                out.insert(event.clone(), asset);
            }
            Read::Missing | Read::Invalid => repairs.note(entry_path, RepairKind::Dropped),
        }
    }
    out
}
