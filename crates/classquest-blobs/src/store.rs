//! The session blob store.
//!
//! [`BlobStore`] combines a [`Backend`] with a per-session cache of
//! [`AccessHandle`]s. The cache is the only place handles are tracked, so
//! every release goes through it and happens exactly once.
//!
//! Operations on different keys are independent. Operations on the same key
//! are not ordered against each other; the last write wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::backend::Backend;
use crate::error::BlobError;
use crate::handle::{AccessHandle, HandleIssuer, ObjectUrlIssuer};
use crate::key::BlobKey;

/// Key-addressed binary store with memoized access handles.
#[derive(Debug)]
pub struct BlobStore<I: HandleIssuer = ObjectUrlIssuer> {
    backend: Backend,
    issuer: I,
    handles: RefCell<HashMap<BlobKey, AccessHandle>>,
}

impl BlobStore<ObjectUrlIssuer> {
    /// Open a durable store in `dir`, falling back to memory when the
    /// directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Self {
        Self::open_with_issuer(dir, ObjectUrlIssuer::new()).await
    }

    /// A session-only store.
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::memory(), ObjectUrlIssuer::new())
    }
}

impl<I: HandleIssuer> BlobStore<I> {
    /// Like [`BlobStore::open`] with a custom issuer.
    pub async fn open_with_issuer(dir: impl Into<PathBuf>, issuer: I) -> Self {
        let dir = dir.into();
        let backend = match Backend::disk(dir.clone()).await {
            Ok(backend) => {
                tracing::debug!(path = %dir.display(), "Opened blob directory");
                backend
            }
            Err(error) => {
                tracing::warn!(
                    path = %dir.display(),
                    %error,
                    "Blob directory unavailable, falling back to memory store"
                );
                Backend::memory()
            }
        };
        Self::with_backend(backend, issuer)
    }

    /// Assemble a store from parts.
    pub fn with_backend(backend: Backend, issuer: I) -> Self {
        Self {
            backend,
            issuer,
            handles: RefCell::new(HashMap::new()),
        }
    }

    /// The storage backend in use.
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The handle issuer.
    pub const fn issuer(&self) -> &I {
        &self.issuer
    }

    /// Number of cached access handles.
    pub fn handle_count(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Store `bytes` under `key`, or under a fresh key when `key` is absent
    /// or blank. Returns the key used.
    ///
    /// A cached handle for the key is released since it points at the old
    /// content.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Io`] if the durable write fails.
    pub async fn put(&self, key: Option<&str>, bytes: &[u8]) -> Result<BlobKey, BlobError> {
        let key = BlobKey::or_generate(key);
        self.backend.write(&key, bytes).await?;
        self.release_cached(&key);
        tracing::debug!(%key, size = bytes.len(), "Stored blob");
        Ok(key)
    }

    /// Read the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Io`] if the durable read fails.
    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let Some(key) = BlobKey::parse(key) else {
            return Ok(None);
        };
        self.backend.read(&key).await
    }

    /// Whether anything is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Io`] if the durable backend cannot be queried.
    pub async fn contains(&self, key: &str) -> Result<bool, BlobError> {
        let Some(key) = BlobKey::parse(key) else {
            return Ok(false);
        };
        self.backend.exists(&key).await
    }

    /// The access handle for `key`, materializing it on first use.
    ///
    /// Returns `None` for unknown keys. When two calls race to materialize
    /// the same key, the first to finish is cached and the other's handle is
    /// released.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] if the bytes cannot be read or the issuer
    /// fails.
    pub async fn access_handle(&self, key: &str) -> Result<Option<AccessHandle>, BlobError> {
        let Some(key) = BlobKey::parse(key) else {
            return Ok(None);
        };
        let cached = self.handles.borrow().get(&key).cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(bytes) = self.backend.read(&key).await? else {
            return Ok(None);
        };
        let fresh = self.issuer.materialize(&key, &bytes)?;

        let winner = self.handles.borrow().get(&key).cloned();
        if let Some(winner) = winner {
            tracing::trace!(%key, "Lost handle race, releasing duplicate");
            self.issuer.release(&fresh);
            return Ok(Some(winner));
        }
        self.handles.borrow_mut().insert(key, fresh.clone());
        Ok(Some(fresh))
    }

    /// Remove the blob under `key` and release its cached handle.
    ///
    /// Unknown keys are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Io`] if the durable delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let Some(key) = BlobKey::parse(key) else {
            return Ok(());
        };
        let removed = self.backend.remove(&key).await?;
        self.release_cached(&key);
        if removed {
            tracing::debug!(%key, "Deleted blob");
        }
        Ok(())
    }

    /// Release the cached handle for `key` without touching the bytes.
    ///
    /// Returns whether a handle was released.
    pub fn invalidate(&self, key: &str) -> bool {
        BlobKey::parse(key).is_some_and(|key| self.release_cached(&key))
    }

    /// Release every cached handle.
    pub fn release_all(&self) {
        let drained: Vec<AccessHandle> = self
            .handles
            .borrow_mut()
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Releasing access handles");
        }
        for handle in &drained {
            self.issuer.release(handle);
        }
    }

    fn release_cached(&self, key: &BlobKey) -> bool {
        let handle = self.handles.borrow_mut().remove(key);
        handle.is_some_and(|handle| {
            self.issuer.release(&handle);
            true
        })
    }
}

impl<I: HandleIssuer> Drop for BlobStore<I> {
    fn drop(&mut self) {
        self.release_all();
    }
}
