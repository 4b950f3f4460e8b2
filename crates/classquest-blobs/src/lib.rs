//! Key-addressed binary storage for avatar and asset data.
//!
//! Blobs are written once under a caller-chosen or generated key and read
//! back through memoized [`AccessHandle`]s. A missing key is a miss, never an
//! error.
//!
//! ```text
//! BlobStore
//!     |-- Backend        (disk directory, or memory fallback)
//!     |-- HandleIssuer   (materializes / releases handles)
//!     +-- handle cache   (one live handle per key per session)
//! ```
//!
//! # Modules
//!
//! - [`key`] -- Key normalization and safe file names
//! - [`handle`] -- Access handles and the issuer trait
//! - [`backend`] -- Disk and memory backends
//! - [`store`] -- The session store
//! - [`error`] -- Shared error types

pub mod backend;
pub mod error;
pub mod handle;
pub mod key;
pub mod store;

pub use backend::Backend;
pub use error::BlobError;
pub use handle::{AccessHandle, HandleIssuer, OBJECT_URL_PREFIX, ObjectUrlIssuer};
pub use key::{BLOB_FILE_EXTENSION, BlobKey};
pub use store::BlobStore;
