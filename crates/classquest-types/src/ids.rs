//! Type-safe identifier wrappers around [`String`].
//!
//! Documents written by older releases carry free-form string ids (short
//! slugs, random base-36 strings, UUIDs), so identifiers stay strings on the
//! wire. The newtypes keep student, quest, and team ids from being mixed at
//! compile time. Freshly generated ids are UUID v7 (time-ordered).

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

define_id! {
    /// Unique identifier for a student.
    StudentId
}

define_id! {
    /// Unique identifier for a team of students.
    TeamId
}

define_id! {
    /// Unique identifier for a quest that awards XP.
    QuestId
}

define_id! {
    /// Unique identifier for an XP log entry.
    LogEntryId
}

define_id! {
    /// Unique identifier for a badge (awarded badge or badge definition).
    BadgeId
}

define_id! {
    /// Unique identifier for a quest/badge category.
    CategoryId
}
