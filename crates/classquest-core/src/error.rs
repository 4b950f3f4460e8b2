//! Error types for document persistence.

use std::path::PathBuf;

use classquest_blobs::BlobError;
use classquest_schema::{MigrationError, StructuralError};

/// Errors that can occur when loading, saving, importing, or exporting a
/// document.
///
/// A failed import or load never touches the current session state.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Reading or writing the document file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The text is not a document at all.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The document was written by a newer version.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The document could not be serialized.
    #[error("Failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// The blob store failed.
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),
}

impl DocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
