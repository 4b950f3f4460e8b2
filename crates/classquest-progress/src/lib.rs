//! Pure progress calculations for ClassQuest.
//!
//! Everything in this crate is a synchronous, side-effect-free function of
//! its inputs. Callers clamp raw document values with the `normalize_*` and
//! [`clamp_total_xp`] helpers before computing.
//!
//! # Modules
//!
//! - [`class`] -- Class-wide stars and the XP left until the next one.
//! - [`level`] -- Student level from cumulative XP.
//! - [`view`] -- Percentage and caption projection for display.

pub mod class;
pub mod level;
pub mod view;

pub use class::{
    ClassProgress, DEFAULT_MILESTONE_STEP, calculate_class_progress, clamp_total_xp,
    compute_class_progress, normalize_milestone_step,
};
pub use level::{DEFAULT_XP_PER_LEVEL, level_for_xp, normalize_xp_per_level};
pub use view::ProgressView;
