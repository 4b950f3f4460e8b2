//! The persisted document file.
//!
//! Every path into the session (load from disk, import of user-provided
//! text) goes through [`DocumentFile::decode_report`]: sanitize, then
//! migrate. Nothing downstream ever sees an unrepaired or outdated
//! document.
//!
//! Saves write a sibling temp file and rename it over the target, so a
//! crash mid-save leaves the previous document intact.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use classquest_schema::{FieldRepair, migrate, sanitize_str};
use classquest_types::AppState;

use crate::error::DocumentError;

/// A decoded document and what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The canonical document at the current version.
    pub state: AppState,
    /// Fields the sanitizer repaired.
    pub repairs: Vec<FieldRepair>,
    /// Version stored in the input.
    pub stored_version: u32,
}

impl Decoded {
    /// Whether any migration step ran.
    pub const fn was_migrated(&self) -> bool {
        self.stored_version != self.state.version
    }
}

/// A JSON document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    /// A document stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and decode the document.
    ///
    /// Returns `Ok(None)` when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file exists but cannot be read,
    /// and the decoding errors of [`DocumentFile::decode_report`].
    pub async fn load(&self) -> Result<Option<Decoded>, DocumentError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No document on disk yet");
                return Ok(None);
            }
            Err(e) => return Err(DocumentError::io(&self.path, e)),
        };
        let decoded = Self::decode_report(&text)?;
        tracing::info!(
            path = %self.path.display(),
            version = decoded.state.version,
            stored_version = decoded.stored_version,
            repairs = decoded.repairs.len(),
            students = decoded.state.students.len(),
            "Document loaded"
        );
        Ok(Some(decoded))
    }

    /// Encode `state` and atomically replace the document with it.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Encode`] if the state cannot be serialized
    /// and [`DocumentError::Io`] if writing fails.
    pub async fn save(&self, state: &AppState) -> Result<(), DocumentError> {
        let text = Self::encode(state)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DocumentError::io(parent, e))?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, text.as_bytes())
            .await
            .map_err(|e| DocumentError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| DocumentError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "Document saved");
        Ok(())
    }

    /// Pretty-printed JSON for export.
    ///
    /// Blob bytes are not embedded; exported documents reference blob keys
    /// only.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Encode`] if serialization fails.
    pub fn encode(state: &AppState) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(state).map_err(DocumentError::Encode)
    }

    /// Decode untrusted text into a canonical, current document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Structural`] if the text is not a JSON
    /// record and [`DocumentError::Migration`] if it was written by a newer
    /// version.
    pub fn decode(text: &str) -> Result<AppState, DocumentError> {
        Self::decode_report(text).map(|decoded| decoded.state)
    }

    /// Like [`DocumentFile::decode`], also returning the repairs made and
    /// the version the input was stored at.
    ///
    /// # Errors
    ///
    /// See [`DocumentFile::decode`].
    pub fn decode_report(text: &str) -> Result<Decoded, DocumentError> {
        let sanitized = sanitize_str(text)?;
        let stored_version = sanitized.state.version;
        let state = migrate(sanitized.state)?;
        Ok(Decoded {
            state,
            repairs: sanitized.repairs,
            stored_version,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("document"), ToOwned::to_owned);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
