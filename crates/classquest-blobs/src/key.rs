//! Blob keys and their on-disk file names.

use std::fmt;
use std::fmt::Write as _;

use uuid::Uuid;

/// Extension of blob files in the durable backend.
pub const BLOB_FILE_EXTENSION: &str = "blob";

/// Opaque, non-empty key of a stored blob.
///
/// Keys are trimmed on construction. They are what avatar packs and the
/// asset library store in the document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    /// Trim `raw` into a key; `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// A fresh, time-ordered key.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The caller's key if usable, otherwise a fresh one.
    pub fn or_generate(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or_else(Self::generate)
    }

    /// Borrow the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this key in the durable backend.
    ///
    /// ASCII letters, digits, `-` and `_` pass through; every other byte is
    /// written as `%XX`. The result never contains a path separator or a
    /// dot, so no key can escape the blob directory.
    pub fn file_name(&self) -> String {
        let mut name = String::with_capacity(self.0.len().saturating_add(5));
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                let _ = write!(name, "%{byte:02X}");
            }
        }
        name.push('.');
        name.push_str(BLOB_FILE_EXTENSION);
        name
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<BlobKey> for String {
    fn from(key: BlobKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!(BlobKey::parse("  avatar-1 ").map(String::from), Some("avatar-1".to_owned()));
        assert_eq!(BlobKey::parse("   "), None);
        assert_eq!(BlobKey::parse(""), None);
    }

    #[test]
    fn blank_key_is_replaced_by_generated_one() {
        let key = BlobKey::or_generate(Some("  "));
        assert_eq!(key.as_str().len(), 36);
        assert_ne!(BlobKey::or_generate(None), key);
    }

    #[test]
    fn file_name_cannot_traverse() {
        let key = BlobKey::parse("../../etc/passwd").map(|k| k.file_name());
        assert_eq!(key.as_deref(), Some("%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.blob"));
    }

    #[test]
    fn distinct_keys_get_distinct_file_names() {
        let a = BlobKey::parse("a b").map(|k| k.file_name());
        let b = BlobKey::parse("a%20b").map(|k| k.file_name());
        assert_ne!(a, b);
    }
}
