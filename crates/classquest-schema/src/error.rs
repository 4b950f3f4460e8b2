//! Error types for loading a document.
//!
//! Field-level problems are never errors: the sanitizer repairs them and
//! reports a [`FieldRepair`](crate::FieldRepair). Only a document that cannot
//! be read as a record at all, or one written by a newer version, fails.

/// The input is not a document at all.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    /// The root value is not a JSON object.
    #[error("Document root is not a record (found {found})")]
    NotARecord {
        /// JSON type name of the root value.
        found: &'static str,
    },

    /// The text is not valid JSON.
    #[error("Document is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The document cannot be brought to the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The document was written by a newer version of the application.
    #[error("Document version {found} is newer than the supported version {supported}")]
    FutureVersion {
        /// Version stored in the document.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// A migration target beyond the newest known version was requested.
    #[error("No migration path to version {target} (newest is {supported})")]
    UnknownTarget {
        /// Requested version.
        target: u32,
        /// Highest version this build understands.
        supported: u32,
    },
}
