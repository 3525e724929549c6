// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Persistence collaborators used by the placement engine.
//!
//! The engine only sees the [`RecordStore`] and [`ObjectStore`] traits. Two
//! backends ship with the crate: in-memory maps for tests and ephemeral use,
//! and sharded directories on the local filesystem. Static and template files
//! are not content records; they go through [`FsRoot`].

mod file_objects;
mod file_records;
mod fs_root;
mod memory;
pub mod record;

pub use file_objects::FileObjectStore;
pub use file_records::FileRecordStore;
pub use fs_root::{FsEntry, FsRoot};
pub use memory::{MemoryObjectStore, MemoryRecordStore};
pub use record::{RecordDocument, StoredRecord};

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Cancelled(String),
    Io(std::io::Error),
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "no stored entry for '{}'", key),
            StoreError::Cancelled(reason) => write!(f, "storage call cancelled: {}", reason),
            StoreError::Io(err) => write!(f, "storage I/O failed: {}", err),
            StoreError::Corrupt(message) => write!(f, "stored data is corrupt: {}", message),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<ron::error::SpannedError> for StoreError {
    fn from(err: ron::error::SpannedError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

impl From<ron::error::Error> for StoreError {
    fn from(err: ron::error::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Document-style store for content metadata and small inline payloads.
///
/// Keys are logical content paths. Every mutation returns the document it
/// displaced so the caller can release storage the old document referenced.
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for `record.document.path` in one step.
    fn upsert(&self, record: StoredRecord) -> Result<Option<RecordDocument>, StoreError>;

    /// Metadata only; the inline payload is not loaded.
    fn find(&self, path: &str) -> Result<Option<RecordDocument>, StoreError>;

    /// Metadata together with the inline payload, read as one consistent snapshot.
    fn find_with_payload(&self, path: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Metadata of every record, payloads excluded.
    fn find_all(&self) -> Result<Vec<RecordDocument>, StoreError>;

    fn remove(&self, path: &str) -> Result<Option<RecordDocument>, StoreError>;
}

pub type ObjectReader = Box<dyn Read + Send>;

/// Blob store for payloads above the inline threshold.
pub trait ObjectStore: Send + Sync {
    /// Stream `reader` into a new object and return the number of bytes written.
    ///
    /// The object only becomes visible under `key` once the whole stream was
    /// written; a failed write leaves nothing behind.
    fn put(&self, key: &ObjectKey, reader: &mut dyn Read) -> Result<u64, StoreError>;

    fn open(&self, key: &ObjectKey) -> Result<ObjectReader, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no object exists for `key`.
    fn remove(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

/// Address of an external payload: the logical path plus a revision token.
///
/// Every write of an external payload gets a fresh revision, so replacing a
/// large item never overwrites bytes a concurrent reader may still stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new_revision(path: &str) -> Self {
        let revision = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}#{}", path, revision))
    }

    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Logical path this object was written for.
    pub fn content_path(&self) -> &str {
        match self.0.rfind('#') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex SHA-256 of a storage key.
pub(crate) fn key_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// `<root>/<first two hex chars>/<digest><suffix>`.
pub(crate) fn sharded_path(root: &Path, key: &str, suffix: &str) -> PathBuf {
    let digest = key_digest(key);
    let shard = &digest[..2];
    root.join(shard).join(format!("{}{}", digest, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_revisions_are_unique_per_write() {
        let first = ObjectKey::new_revision("media/video.mp4");
        let second = ObjectKey::new_revision("media/video.mp4");
        assert_ne!(first, second);
        assert_eq!(first.content_path(), "media/video.mp4");
        assert_eq!(second.content_path(), "media/video.mp4");
    }

    #[test]
    fn sharded_path_uses_two_char_prefix() {
        let path = sharded_path(Path::new("/records"), "docs/intro.md", ".ron");
        let digest = key_digest("docs/intro.md");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            path,
            PathBuf::from(format!("/records/{}/{}.ron", &digest[..2], digest))
        );
    }
}
