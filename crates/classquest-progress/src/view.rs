//! Display projection of [`ClassProgress`].
//!
//! A [`ProgressView`] is recomputed from the canonical numbers on every
//! call. Nothing here is stored in the document.

use serde::Serialize;

use crate::class::ClassProgress;

/// What the progress bar and its caption show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    /// Stars earned.
    pub stars: u64,
    /// Completion of the current step in whole percent (`0..=99`).
    pub percent: u8,
    /// Total XP at which the next star is earned.
    pub next_target: u64,
    /// XP still needed for the next star.
    pub remaining_xp: u64,
    /// Caption, e.g. `"2 Stars · 375 / 750 XP · 375 XP to go"`.
    pub label: String,
}

impl ProgressView {
    /// Project a [`ClassProgress`] for display.
    ///
    /// `stars_name` is the class's display name for stars.
    pub fn project(progress: &ClassProgress, stars_name: &str) -> Self {
        Self {
            stars: progress.stars,
            percent: percent_of_step(progress),
            next_target: progress.next_target(),
            remaining_xp: progress.remaining_xp,
            label: format!(
                "{} {} · {} / {} XP · {} XP to go",
                progress.stars,
                stars_name,
                progress.step_xp,
                progress.step,
                progress.remaining_xp
            ),
        }
    }
}

/// Floor of `step_xp / step * 100`. Always below 100 since `step_xp < step`.
fn percent_of_step(progress: &ClassProgress) -> u8 {
    let scaled = u128::from(progress.step_xp).saturating_mul(100);
    let percent = scaled.checked_div(u128::from(progress.step)).unwrap_or(0);
    u8::try_from(percent).unwrap_or(99).min(99)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;
    use crate::class::{DEFAULT_MILESTONE_STEP, calculate_class_progress};

    fn progress(total: u64, step: u64) -> ClassProgress {
        calculate_class_progress(total, NonZeroU64::new(step).unwrap_or(DEFAULT_MILESTONE_STEP))
    }

    #[test]
    fn percent_resets_at_each_milestone() {
        assert_eq!(ProgressView::project(&progress(0, 1000), "Stars").percent, 0);
        assert_eq!(ProgressView::project(&progress(999, 1000), "Stars").percent, 99);
        assert_eq!(ProgressView::project(&progress(1000, 1000), "Stars").percent, 0);
        assert_eq!(ProgressView::project(&progress(1125, 750), "Stars").percent, 50);
    }

    #[test]
    fn label_reads_full_step_at_milestone() {
        let view = ProgressView::project(&progress(2000, 1000), "Stars");
        assert_eq!(view.label, "2 Stars · 0 / 1000 XP · 1000 XP to go");
        assert_eq!(view.next_target, 3000);
        assert_eq!(view.remaining_xp, 1000);
    }

    #[test]
    fn projection_tracks_source_numbers() {
        let before = ProgressView::project(&progress(450, 200), "Sterne");
        let after = ProgressView::project(&progress(590, 200), "Sterne");
        assert_eq!(before.percent, 25);
        assert_eq!(before.next_target, 600);
        assert_eq!(after.percent, 95);
        assert_eq!(after.remaining_xp, 10);
    }
}
