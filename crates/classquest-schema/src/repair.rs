//! Diagnostics for repaired fields.

use std::fmt;

use serde::Serialize;

/// What the sanitizer did to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RepairKind {
    /// Missing or unreadable; replaced by the default.
    Defaulted,
    /// Readable but in the wrong representation (numeric text, padded
    /// text, fractional count).
    Coerced,
    /// Moved into its allowed range.
    Clamped,
    /// Unusable entry or value removed.
    Dropped,
    /// Repeated entry removed; the first occurrence was kept.
    Deduplicated,
    /// Derived value rebuilt from its sources.
    Recomputed,
}

impl RepairKind {
    /// Lowercase name used in logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Defaulted => "defaulted",
            Self::Coerced => "coerced",
            Self::Clamped => "clamped",
            Self::Dropped => "dropped",
            Self::Deduplicated => "deduplicated",
            Self::Recomputed => "recomputed",
        }
    }
}

impl fmt::Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One repaired field, addressed by a JSON-path-like string such as
/// `students[2].xp` or `settings.xpPerLevel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRepair {
    /// Location of the field in the input document.
    pub path: String,
    /// What was done.
    pub kind: RepairKind,
}

impl fmt::Display for FieldRepair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}
