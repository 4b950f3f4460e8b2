//! Error types for the blob store.
//!
//! A missing key is not an error: lookups return `None` and deletes of
//! unknown keys are no-ops. [`BlobError`] covers real failures only.

/// Errors that can occur in the blob store.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// A filesystem operation on the durable backend failed.
    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The handle issuer could not materialize a handle.
    #[error("Cannot issue access handle for {key}: {reason}")]
    Handle {
        /// The key being materialized.
        key: String,
        /// Issuer-provided reason.
        reason: String,
    },
}
