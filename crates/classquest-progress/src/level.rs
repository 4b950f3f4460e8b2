//! Student level derivation.

use std::num::NonZeroU32;

/// XP per level used when the configured value is missing or not positive.
pub const DEFAULT_XP_PER_LEVEL: NonZeroU32 = match NonZeroU32::new(100) {
    Some(value) => value,
    None => NonZeroU32::MIN,
};

/// Normalize a stored XP-per-level setting.
pub fn normalize_xp_per_level(value: Option<i64>) -> NonZeroU32 {
    value
        .and_then(|raw| u32::try_from(raw).ok())
        .and_then(NonZeroU32::new)
        .unwrap_or(DEFAULT_XP_PER_LEVEL)
}

/// Level for a cumulative XP value: `floor(xp / xp_per_level) + 1`.
///
/// Negative XP counts as zero, so the lowest level is 1.
pub fn level_for_xp(xp: i64, xp_per_level: NonZeroU32) -> u32 {
    let xp = u64::try_from(xp).unwrap_or(0);
    let completed = xp.checked_div(u64::from(xp_per_level.get())).unwrap_or(0);
    u32::try_from(completed)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}
