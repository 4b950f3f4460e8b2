//! Fresh documents.

use classquest_schema::CURRENT_VERSION;
use classquest_types::{
    AppState, ClassProgressCache, DEFAULT_CLASS_MILESTONE_STEP, DEFAULT_XP_PER_LEVEL, Settings,
    Theme,
};

use crate::config::DefaultsConfig;

/// An empty document at [`CURRENT_VERSION`] with settings taken from
/// `defaults`.
///
/// Values the rest of the system divides by or orders on are normalized the
/// same way the sanitizer would: zero divisors fall back to their defaults,
/// the first stage threshold is at least 1, and the second is above the
/// first. Unknown themes fall back to [`Theme::System`].
pub fn create_initial_state(defaults: &DefaultsConfig) -> AppState {
    let theme = Theme::parse(&defaults.theme).unwrap_or_else(|| {
        tracing::warn!(theme = %defaults.theme, "Unknown default theme, using system");
        Theme::default()
    });
    let [first, second] = defaults.avatar_stage_thresholds;
    let first = first.max(1);
    let second = second.max(first.saturating_add(1));

    let settings = Settings {
        class_name: defaults.class_name.clone(),
        xp_per_level: non_zero_or(defaults.xp_per_level, DEFAULT_XP_PER_LEVEL),
        class_milestone_step: non_zero_or(
            defaults.class_milestone_step,
            DEFAULT_CLASS_MILESTONE_STEP,
        ),
        class_stars_name: defaults.class_stars_name.clone(),
        streak_threshold_for_badge: defaults.streak_threshold_for_badge.max(1),
        avatar_stage_thresholds: [first, second],
        theme,
        sfx_enabled: defaults.sfx_enabled,
        ..Settings::default()
    };

    let mut state = AppState::empty(CURRENT_VERSION, settings);
    state.class_progress = Some(ClassProgressCache {
        total_xp: 0,
        stars: 0,
    });
    state
}

const fn non_zero_or(value: u32, fallback: u32) -> u32 {
    if value == 0 { fallback } else { value }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use classquest_schema::sanitize;

    use super::*;

    #[test]
    fn initial_state_is_current_and_empty() {
        let state = create_initial_state(&DefaultsConfig::default());
        assert_eq!(state.version, CURRENT_VERSION);
        assert!(state.students.is_empty());
        assert!(state.logs.is_empty());
        assert_eq!(state.settings, Settings::default());
        assert_eq!(
            state.class_progress,
            Some(ClassProgressCache { total_xp: 0, stars: 0 })
        );
    }

    #[test]
    fn degenerate_defaults_are_normalized() {
        let defaults = DefaultsConfig {
            xp_per_level: 0,
            class_milestone_step: 0,
            avatar_stage_thresholds: [0, 0],
            theme: "neon".to_owned(),
            ..DefaultsConfig::default()
        };
        let state = create_initial_state(&defaults);
        assert_eq!(state.settings.xp_per_level, DEFAULT_XP_PER_LEVEL);
        assert_eq!(state.settings.class_milestone_step, DEFAULT_CLASS_MILESTONE_STEP);
        assert_eq!(state.settings.avatar_stage_thresholds, [1, 2]);
        assert_eq!(state.settings.theme, Theme::System);
    }

    #[test]
    fn initial_state_is_already_canonical() {
        let defaults = DefaultsConfig {
            class_name: "3a".to_owned(),
            theme: "Dark".to_owned(),
            ..DefaultsConfig::default()
        };
        let state = create_initial_state(&defaults);
        let raw = serde_json::to_value(&state).unwrap();
        let again = sanitize(&raw).unwrap();
        assert!(again.is_clean(), "unexpected repairs: {:?}", again.repairs);
        assert_eq!(again.state, state);
    }
}
