// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{ObjectKey, ObjectReader, ObjectStore, StoreError, sharded_path};
use crate::util::copy_atomic;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Large objects as plain files, `objects/<shard>/<sha256 of key>`.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, key: &ObjectKey) -> PathBuf {
        sharded_path(&self.root, key.as_str(), "")
    }
}

impl ObjectStore for FileObjectStore {
    fn put(&self, key: &ObjectKey, reader: &mut dyn Read) -> Result<u64, StoreError> {
        let target = self.object_path(key);
        let written = copy_atomic(&target, reader)?;
        log::debug!("Stored object {} ({} bytes)", key, written);
        Ok(written)
    }

    fn open(&self, key: &ObjectKey) -> Result<ObjectReader, StoreError> {
        match File::open(self.object_path(key)) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn remove(&self, key: &ObjectKey) -> Result<(), StoreError> {
        match fs::remove_file(self.object_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn put_open_remove_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::new(dir.path());
        let key = ObjectKey::new_revision("media/clip.webm");

        let payload = vec![7u8; 64 * 1024];
        let written = store.put(&key, &mut Cursor::new(payload.clone())).unwrap();
        assert_eq!(written, payload.len() as u64);
        assert!(store.object_path(&key).starts_with(dir.path()));

        let mut read_back = Vec::new();
        store.open(&key).unwrap().read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, payload);

        store.remove(&key).unwrap();
        assert!(matches!(store.open(&key), Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove(&key), Err(StoreError::NotFound(_))));
    }
}
