//! Access handles and the issuer seam.
//!
//! An [`AccessHandle`] is a short-lived reference through which a renderer
//! reaches blob bytes (an object URL in a browser, a mapped file elsewhere).
//! Handles are scarce: every materialized handle must be released exactly
//! once. The [`BlobStore`](crate::BlobStore) owns that bookkeeping; issuers
//! only create and destroy.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::error::BlobError;
use crate::key::BlobKey;

/// Prefix of handles minted by [`ObjectUrlIssuer`].
pub const OBJECT_URL_PREFIX: &str = "blob:classquest/";

/// Opaque reference to materialized blob bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessHandle(String);

impl AccessHandle {
    /// Wrap an issuer-specific handle string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the handle text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and destroys [`AccessHandle`]s.
///
/// Implementations are used from a single thread and may keep interior
/// state behind `RefCell`.
pub trait HandleIssuer {
    /// Create a handle for `bytes` stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Handle`] if no handle can be created.
    fn materialize(&self, key: &BlobKey, bytes: &[u8]) -> Result<AccessHandle, BlobError>;

    /// Destroy a handle previously returned by [`materialize`](Self::materialize).
    fn release(&self, handle: &AccessHandle);
}

/// Default issuer minting `blob:classquest/<uuid>` handles.
///
/// Tracks live handles so leaks and double releases are observable.
#[derive(Debug, Default)]
pub struct ObjectUrlIssuer {
    live: RefCell<HashSet<AccessHandle>>,
}

impl ObjectUrlIssuer {
    /// Create an issuer with no live handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles materialized and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    /// Whether `handle` is currently live.
    pub fn is_live(&self, handle: &AccessHandle) -> bool {
        self.live.borrow().contains(handle)
    }
}

impl HandleIssuer for ObjectUrlIssuer {
    fn materialize(&self, key: &BlobKey, bytes: &[u8]) -> Result<AccessHandle, BlobError> {
        let handle = AccessHandle(format!("{OBJECT_URL_PREFIX}{}", Uuid::new_v4()));
        tracing::trace!(%key, %handle, size = bytes.len(), "Issued access handle");
        self.live.borrow_mut().insert(handle.clone());
        Ok(handle)
    }

    fn release(&self, handle: &AccessHandle) {
        let removed = self.live.borrow_mut().remove(handle);
        if !removed {
            tracing::warn!(%handle, "Released an access handle that is not live");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn issued_handles_are_unique_and_tracked() {
        let issuer = ObjectUrlIssuer::new();
        let key = BlobKey::parse("k").unwrap();
        let a = issuer.materialize(&key, b"x").unwrap();
        let b = issuer.materialize(&key, b"x").unwrap();

        assert_ne!(a, b);
        assert!(a.as_str().starts_with(OBJECT_URL_PREFIX));
        assert_eq!(issuer.live_count(), 2);

        issuer.release(&a);
        assert!(!issuer.is_live(&a));
        assert!(issuer.is_live(&b));
    }

    #[test]
    fn double_release_is_harmless() {
        let issuer = ObjectUrlIssuer::new();
        let handle = issuer
            .materialize(&BlobKey::parse("k").unwrap(), b"")
            .unwrap();
        issuer.release(&handle);
        issuer.release(&handle);
        assert_eq!(issuer.live_count(), 0);
    }
}
