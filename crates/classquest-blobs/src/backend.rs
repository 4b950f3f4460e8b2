//! Storage backends.
//!
//! | Backend | Durability | Layout |
//! |---------|------------|--------|
//! | [`Backend::Disk`] | survives restarts | one `<encoded key>.blob` file per key |
//! | [`Backend::Memory`] | session only | `HashMap` of key to bytes |

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::BlobError;
use crate::key::BlobKey;

/// Where blob bytes live.
#[derive(Debug)]
pub enum Backend {
    /// Files in a directory.
    Disk {
        /// The blob directory.
        root: PathBuf,
    },
    /// In-process map.
    Memory {
        /// Stored blobs.
        blobs: RefCell<HashMap<BlobKey, Vec<u8>>>,
    },
}

impl Backend {
    /// An empty in-memory backend.
    pub fn memory() -> Self {
        Self::Memory {
            blobs: RefCell::new(HashMap::new()),
        }
    }

    /// A disk backend rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Io`] if the directory cannot be created.
    pub async fn disk(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self::Disk { root })
    }

    /// Whether blobs survive the session.
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::Disk { .. })
    }

    /// The blob directory of a disk backend.
    pub fn root(&self) -> Option<&Path> {
        match self {
            Self::Disk { root } => Some(root),
            Self::Memory { .. } => None,
        }
    }

    pub(crate) async fn write(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), BlobError> {
        match self {
            Self::Disk { root } => {
                let path = root.join(key.file_name());
                let tmp = path.with_extension("tmp");
                tokio::fs::write(&tmp, bytes).await?;
                tokio::fs::rename(&tmp, &path).await?;
            }
            Self::Memory { blobs } => {
                blobs.borrow_mut().insert(key.clone(), bytes.to_vec());
            }
        }
        Ok(())
    }

    pub(crate) async fn read(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobError> {
        match self {
            Self::Disk { root } => match tokio::fs::read(root.join(key.file_name())).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            Self::Memory { blobs } => Ok(blobs.borrow().get(key).cloned()),
        }
    }

    pub(crate) async fn exists(&self, key: &BlobKey) -> Result<bool, BlobError> {
        match self {
            Self::Disk { root } => Ok(tokio::fs::try_exists(root.join(key.file_name())).await?),
            Self::Memory { blobs } => Ok(blobs.borrow().contains_key(key)),
        }
    }

    /// Remove `key`; returns whether anything was removed.
    pub(crate) async fn remove(&self, key: &BlobKey) -> Result<bool, BlobError> {
        match self {
            Self::Disk { root } => match tokio::fs::remove_file(root.join(key.file_name())).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            },
            Self::Memory { blobs } => Ok(blobs.borrow_mut().remove(key).is_some()),
        }
    }
}
