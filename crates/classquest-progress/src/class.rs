//! Class-wide milestone progress.
//!
//! The class collects XP as a whole; every `step` XP unlocks one star.
//! [`calculate_class_progress`] is total over its (already clamped) inputs
//! and never panics.
//!
//! # Boundary rule
//!
//! Exactly at a milestone (`step_xp == 0`) the remaining XP reads as the
//! full step, never zero: the star was just earned and the next one is a
//! whole step away.

use std::num::NonZeroU64;

use serde::Serialize;

/// Milestone step used when the configured one is missing or not positive.
pub const DEFAULT_MILESTONE_STEP: NonZeroU64 = match NonZeroU64::new(1000) {
    Some(step) => step,
    None => NonZeroU64::MIN,
};

/// Derived class progress for a total XP and milestone step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClassProgress {
    /// Total class XP the progress was computed from.
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    /// XP between two stars.
    pub step: u64,
    /// Stars earned: `total_xp / step`.
    pub stars: u64,
    /// XP collected towards the next star: `total_xp % step`.
    #[serde(rename = "stepXP")]
    pub step_xp: u64,
    /// XP still needed for the next star; never zero.
    #[serde(rename = "remainingXP")]
    pub remaining_xp: u64,
}

impl ClassProgress {
    /// Total XP at which the next star is earned.
    pub const fn next_target(&self) -> u64 {
        self.stars.saturating_add(1).saturating_mul(self.step)
    }
}

/// Normalize a stored milestone step.
///
/// Missing, zero, and negative steps fall back to [`DEFAULT_MILESTONE_STEP`].
pub fn normalize_milestone_step(step: Option<i64>) -> NonZeroU64 {
    step.and_then(|raw| u64::try_from(raw).ok())
        .and_then(NonZeroU64::new)
        .unwrap_or(DEFAULT_MILESTONE_STEP)
}

/// Clamp a class XP total at zero.
pub fn clamp_total_xp(total_xp: i64) -> u64 {
    u64::try_from(total_xp).unwrap_or(0)
}

/// Compute the class progress for a total XP and a milestone step.
pub fn calculate_class_progress(total_xp: u64, step: NonZeroU64) -> ClassProgress {
    let stars = total_xp / step;
    let step_xp = total_xp % step;
    let remaining_xp = if step_xp == 0 {
        step.get()
    } else {
        // step_xp < step, so this never saturates.
        step.get().saturating_sub(step_xp)
    };
    ClassProgress {
        total_xp,
        step: step.get(),
        stars,
        step_xp,
        remaining_xp,
    }
}

/// Compute the class progress from individual student XP values.
///
/// Negative student XP (penalties) reduces the sum; the sum itself is
/// clamped at zero.
pub fn compute_class_progress<I>(student_xp: I, step: NonZeroU64) -> ClassProgress
where
    I: IntoIterator<Item = i64>,
{
    let total = student_xp
        .into_iter()
        .fold(0_i64, |sum, xp| sum.saturating_add(xp));
    calculate_class_progress(clamp_total_xp(total), step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(value: u64) -> NonZeroU64 {
        NonZeroU64::new(value).unwrap_or(DEFAULT_MILESTONE_STEP)
    }

    fn triple(progress: ClassProgress) -> (u64, u64, u64) {
        (progress.stars, progress.step_xp, progress.remaining_xp)
    }

    #[test]
    fn starts_from_zero_each_milestone() {
        let s = step(1000);
        assert_eq!(triple(calculate_class_progress(0, s)), (0, 0, 1000));
        assert_eq!(triple(calculate_class_progress(999, s)), (0, 999, 1));
        assert_eq!(triple(calculate_class_progress(1000, s)), (1, 0, 1000));
        assert_eq!(triple(calculate_class_progress(1999, s)), (1, 999, 1));
        assert_eq!(triple(calculate_class_progress(2000, s)), (2, 0, 1000));
    }

    #[test]
    fn handles_custom_step_sizes() {
        assert_eq!(
            triple(calculate_class_progress(1125, step(750))),
            (1, 375, 375)
        );
    }

    #[test]
    fn invariants_hold_across_ranges() {
        for s in [1_u64, 2, 7, 750, 1000] {
            for total in (0_u64..5000).step_by(13) {
                let p = calculate_class_progress(total, step(s));
                assert!(p.step_xp < p.step, "total={total} step={s}");
                assert_eq!(p.stars, total / s);
                assert!(p.remaining_xp > 0);
                assert!(p.remaining_xp <= p.step);
                if p.step_xp == 0 {
                    assert_eq!(p.remaining_xp, p.step);
                } else {
                    assert_eq!(p.remaining_xp, p.step - p.step_xp);
                }
            }
        }
    }

    #[test]
    fn step_of_one_always_has_full_step_remaining() {
        let p = calculate_class_progress(12345, NonZeroU64::MIN);
        assert_eq!(triple(p), (12345, 0, 1));
    }

    #[test]
    fn extreme_totals_do_not_overflow() {
        let p = calculate_class_progress(u64::MAX, step(1000));
        assert_eq!(p.stars, u64::MAX / 1000);
        assert_eq!(p.next_target(), u64::MAX);
    }

    #[test]
    fn normalize_step_rejects_non_positive() {
        assert_eq!(normalize_milestone_step(None), DEFAULT_MILESTONE_STEP);
        assert_eq!(normalize_milestone_step(Some(0)), DEFAULT_MILESTONE_STEP);
        assert_eq!(normalize_milestone_step(Some(-20)), DEFAULT_MILESTONE_STEP);
        assert_eq!(normalize_milestone_step(Some(250)).get(), 250);
    }

    #[test]
    fn compute_sums_students_and_clamps_at_zero() {
        let p = compute_class_progress([50, -100], step(1000));
        assert_eq!(p.total_xp, 0);
        assert_eq!(p.stars, 0);

        let p = compute_class_progress([1200], step(1000));
        assert_eq!(p.total_xp, 1200);
        assert_eq!(p.stars, 1);
        assert_eq!(p.remaining_xp, 800);
        assert_eq!(p.next_target(), 2000);
    }

    #[test]
    fn serializes_with_document_field_names() {
        let p = calculate_class_progress(1125, step(750));
        let json = serde_json::to_value(p).unwrap_or_default();
        assert_eq!(json["totalXP"], 1125);
        assert_eq!(json["stepXP"], 375);
        assert_eq!(json["remainingXP"], 375);
    }
}
