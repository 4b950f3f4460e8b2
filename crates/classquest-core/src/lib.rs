//! Document persistence, session state, and configuration for ClassQuest.
//!
//! This crate ties the pure building blocks together: documents are read
//! through the sanitizer and migrator from `classquest-schema`, effects go
//! through a session-owned event bus, and media lives in a session-owned
//! blob store.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `classquest-config.yaml`
//! - [`document`] -- [`DocumentFile`] load, save, import, and export
//! - [`initial`] -- Fresh documents from configured defaults
//! - [`selectors`] -- Read-only queries over a document
//! - [`session`] -- The live [`Session`]
//! - [`error`] -- [`DocumentError`]

pub mod config;
pub mod document;
pub mod error;
pub mod initial;
pub mod selectors;
pub mod session;

pub use config::{ClassQuestConfig, ConfigError};
pub use document::{Decoded, DocumentFile};
pub use error::DocumentError;
pub use initial::create_initial_state;
pub use selectors::{
    DEFAULT_LOG_LIMIT, avatar_key_for, avatar_stage_index, class_progress, logs_for_student,
    orphaned_logs, student_by_id,
};
pub use session::{Session, referenced_blob_keys};
