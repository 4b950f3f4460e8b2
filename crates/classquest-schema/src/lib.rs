//! Sanitizer and migrator for the persisted ClassQuest document.
//!
//! Every document, whether loaded from disk or imported from an export,
//! passes through two stages before anything else reads it:
//!
//! ```text
//! text --decode--> JSON value --sanitize--> AppState (any version)
//!                                              |
//!                                   migrate ---+--> AppState (CURRENT_VERSION)
//! ```
//!
//! # Modules
//!
//! - [`sanitize`] -- Field-level repair of untrusted input
//! - [`migrate`] -- Forward-only version steps
//! - [`repair`] -- Diagnostics for repaired fields
//! - [`error`] -- Structural and migration errors

pub mod error;
pub mod migrate;
pub mod repair;
pub mod sanitize;

pub use error::{MigrationError, StructuralError};
pub use migrate::{CURRENT_VERSION, MIGRATIONS, Migration, migrate, migrate_to};
pub use repair::{FieldRepair, RepairKind};
pub use sanitize::{EPOCH_AWARDED_AT, Sanitized, sanitize, sanitize_at, sanitize_str};
