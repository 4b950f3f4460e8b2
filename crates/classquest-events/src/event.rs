//! The closed set of domain events.

use std::fmt;

/// A domain event emitted after a state change.
///
/// Events carry just enough to drive side effects (sounds, animations);
/// they never carry the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// XP was granted to one or more students.
    XpGranted {
        /// XP delta of the award.
        amount: i64,
        /// Class XP within the current milestone step after the award.
        new_segment_xp: u64,
    },
    /// A student reached a new level.
    LevelUp {
        /// The level reached.
        new_level: u32,
        /// The student, when known.
        student_id: Option<String>,
    },
    /// A badge was awarded.
    BadgeAwarded {
        /// The awarded badge.
        badge_id: String,
        /// The receiving student, when known.
        student_id: Option<String>,
    },
    /// The class earned a new star.
    ClassMilestone {
        /// Stars after the award.
        stars: u64,
    },
    /// The slideshow presents a student's avatar.
    AvatarPresented {
        /// The presented student.
        student_id: String,
    },
    /// The slideshow flies a badge in.
    BadgeFlyIn {
        /// The badge.
        badge_id: String,
    },
}

impl AppEvent {
    /// The kind tag used for subscription.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::XpGranted { .. } => EventKind::XpGranted,
            Self::LevelUp { .. } => EventKind::LevelUp,
            Self::BadgeAwarded { .. } => EventKind::BadgeAwarded,
            Self::ClassMilestone { .. } => EventKind::ClassMilestone,
            Self::AvatarPresented { .. } => EventKind::AvatarPresented,
            Self::BadgeFlyIn { .. } => EventKind::BadgeFlyIn,
        }
    }
}

/// Tag of an [`AppEvent`]; handlers subscribe to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// See [`AppEvent::XpGranted`].
    XpGranted,
    /// See [`AppEvent::LevelUp`].
    LevelUp,
    /// See [`AppEvent::BadgeAwarded`].
    BadgeAwarded,
    /// See [`AppEvent::ClassMilestone`].
    ClassMilestone,
    /// See [`AppEvent::AvatarPresented`].
    AvatarPresented,
    /// See [`AppEvent::BadgeFlyIn`].
    BadgeFlyIn,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::XpGranted,
        Self::LevelUp,
        Self::BadgeAwarded,
        Self::ClassMilestone,
        Self::AvatarPresented,
        Self::BadgeFlyIn,
    ];

    /// Stable wire name, e.g. `xp:granted`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::XpGranted => "xp:granted",
            Self::LevelUp => "level:up",
            Self::BadgeAwarded => "badge:awarded",
            Self::ClassMilestone => "class:milestone",
            Self::AvatarPresented => "slideshow:avatar:present",
            Self::BadgeFlyIn => "slideshow:badge:flyin",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let event = AppEvent::BadgeAwarded {
            badge_id: "b1".to_owned(),
            student_id: None,
        };
        assert_eq!(event.kind(), EventKind::BadgeAwarded);
        assert_eq!(event.kind().to_string(), "badge:awarded");
    }

    #[test]
    fn wire_names_are_distinct() {
        let mut names: Vec<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());
    }
}
