// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{RecordDocument, RecordStore, StoreError, StoredRecord, sharded_path};
use crate::content::item::Placement;
use crate::util::{is_temp_upload_name, write_atomic};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use walkdir::WalkDir;

const DOCUMENT_SUFFIX: &str = ".ron";
const PAYLOAD_SUFFIX: &str = ".bin";

/// Records as RON documents with an inline payload file alongside:
/// `records/<shard>/<sha256 of path>.ron` and `.bin`.
///
/// A store-wide lock keeps the document and payload files of a record
/// consistent for readers while an upsert or removal swaps them.
pub struct FileRecordStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, path: &str) -> PathBuf {
        sharded_path(&self.root, path, DOCUMENT_SUFFIX)
    }

    fn payload_path(&self, path: &str) -> PathBuf {
        sharded_path(&self.root, path, PAYLOAD_SUFFIX)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        match self.lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("FileRecordStore lock poisoned on read; recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        match self.lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("FileRecordStore lock poisoned on write; recovering");
                poisoned.into_inner()
            }
        }
    }

    fn read_document(&self, file: &Path) -> Result<Option<RecordDocument>, StoreError> {
        let raw = match fs::read_to_string(file) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let document: RecordDocument = ron::from_str(&raw)?;
        Ok(Some(document))
    }

    fn load(&self, path: &str) -> Result<Option<RecordDocument>, StoreError> {
        let document = self.read_document(&self.document_path(path))?;
        match document {
            Some(document) if document.path != path => Err(StoreError::Corrupt(format!(
                "record for '{}' holds path '{}'",
                path, document.path
            ))),
            other => Ok(other),
        }
    }
}

fn remove_if_present(file: &Path) -> Result<(), StoreError> {
    match fs::remove_file(file) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::Io(err)),
    }
}

fn read_if_present(file: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(file) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::Io(err)),
    }
}

/// Swap the payload file and the document so a failed document write leaves
/// the previous record readable.
///
/// A new inline payload goes in before the document; if the document write
/// then fails, `previous_payload` is put back. A stale payload is only
/// removed once the document that no longer needs it is in place.
fn commit_payload(
    payload_file: &Path,
    inline: Option<&[u8]>,
    previous_payload: Option<Vec<u8>>,
    write_document: impl FnOnce() -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    match inline {
        Some(bytes) => {
            write_atomic(payload_file, bytes)?;
            if let Err(err) = write_document() {
                restore_payload(payload_file, previous_payload);
                return Err(err);
            }
        }
        None => {
            write_document()?;
            if let Err(err) = remove_if_present(payload_file) {
                log::warn!(
                    "Stale inline payload {} left behind: {}",
                    payload_file.display(),
                    err
                );
            }
        }
    }
    Ok(())
}

fn restore_payload(payload_file: &Path, previous_payload: Option<Vec<u8>>) {
    let restored = match previous_payload {
        Some(bytes) => write_atomic(payload_file, &bytes).map_err(StoreError::Io),
        None => remove_if_present(payload_file),
    };
    if let Err(err) = restored {
        log::error!(
            "Could not restore inline payload {}: {}",
            payload_file.display(),
            err
        );
    }
}

impl RecordStore for FileRecordStore {
    fn upsert(&self, record: StoredRecord) -> Result<Option<RecordDocument>, StoreError> {
        let path = record.document.path.clone();
        let document_file = self.document_path(&path);
        let payload_file = self.payload_path(&path);
        let serialized = ron::ser::to_string_pretty(
            &record.document,
            ron::ser::PrettyConfig::new().separate_tuple_members(true),
        )?;

        let _guard = self.write_guard();
        let previous = self.load(&path)?;
        let previous_payload = match previous.as_ref().and_then(RecordDocument::placement) {
            Some(Placement::Inline) => read_if_present(&payload_file)?,
            _ => None,
        };

        commit_payload(
            &payload_file,
            record.inline.as_deref(),
            previous_payload,
            || Ok(write_atomic(&document_file, serialized.as_bytes())?),
        )?;

        Ok(previous)
    }

    fn find(&self, path: &str) -> Result<Option<RecordDocument>, StoreError> {
        let _guard = self.read_guard();
        self.load(path)
    }

    fn find_with_payload(&self, path: &str) -> Result<Option<StoredRecord>, StoreError> {
        let _guard = self.read_guard();
        let Some(document) = self.load(path)? else {
            return Ok(None);
        };
        let inline = match document.placement() {
            Some(Placement::Inline) => match fs::read(self.payload_path(path)) {
                Ok(bytes) => Some(bytes),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(StoreError::Corrupt(format!(
                        "inline payload missing for '{}'",
                        path
                    )));
                }
                Err(err) => return Err(StoreError::Io(err)),
            },
            _ => None,
        };
        Ok(Some(StoredRecord { document, inline }))
    }

    fn find_all(&self) -> Result<Vec<RecordDocument>, StoreError> {
        let _guard = self.read_guard();
        let mut documents = Vec::new();
        if !self.root.exists() {
            return Ok(documents);
        }
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|err| {
                StoreError::Io(
                    err.into_io_error()
                        .unwrap_or_else(|| io::Error::other("record walk failed")),
                )
            })?;
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file()
                || is_temp_upload_name(&name)
                || !name.ends_with(DOCUMENT_SUFFIX)
            {
                continue;
            }
            if let Some(document) = self.read_document(entry.path())? {
                documents.push(document);
            }
        }
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    fn remove(&self, path: &str) -> Result<Option<RecordDocument>, StoreError> {
        let _guard = self.write_guard();
        let previous = self.load(path)?;
        if previous.is_some() {
            remove_if_present(&self.document_path(path))?;
            remove_if_present(&self.payload_path(path))?;
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_record(path: &str, bytes: &[u8]) -> StoredRecord {
        StoredRecord {
            document: RecordDocument {
                path: path.to_string(),
                size: bytes.len() as u64,
                last_modified: "2024-02-03T04:05:06+00:00".to_string(),
                mime: "text/plain".to_string(),
                is_markdown: false,
                placement: "inline".to_string(),
                object_key: None,
            },
            inline: Some(bytes.to_vec()),
        }
    }

    #[test]
    fn upsert_replaces_and_reports_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());

        assert!(store.upsert(inline_record("notes/a.txt", b"one")).unwrap().is_none());
        let previous = store
            .upsert(inline_record("notes/a.txt", b"second"))
            .unwrap()
            .expect("previous document");
        assert_eq!(previous.size, 3);

        let loaded = store.find_with_payload("notes/a.txt").unwrap().unwrap();
        assert_eq!(loaded.inline.as_deref(), Some(&b"second"[..]));
        assert_eq!(store.find_all().unwrap().len(), 1);
    }

    #[test]
    fn external_upsert_drops_stale_inline_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.upsert(inline_record("big.bin", b"small")).unwrap();

        let mut external = inline_record("big.bin", b"");
        external.inline = None;
        external.document.size = 99;
        external.document.placement = "external".to_string();
        external.document.object_key = Some("big.bin#rev".to_string());
        store.upsert(external).unwrap();

        assert!(!store.payload_path("big.bin").exists());
        let loaded = store.find_with_payload("big.bin").unwrap().unwrap();
        assert!(loaded.inline.is_none());
        assert_eq!(loaded.document.object_key.as_deref(), Some("big.bin#rev"));
    }

    #[test]
    fn remove_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.upsert(inline_record("x.txt", b"x")).unwrap();

        assert!(store.remove("x.txt").unwrap().is_some());
        assert!(store.remove("x.txt").unwrap().is_none());
        assert!(store.find("x.txt").unwrap().is_none());
        assert!(store.find_all().unwrap().is_empty());
    }

    fn failing_document() -> Result<(), StoreError> {
        Err(StoreError::Io(io::Error::other("disk full")))
    }

    #[test]
    fn failed_document_write_restores_previous_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.upsert(inline_record("notes/a.txt", b"one")).unwrap();
        let payload_file = store.payload_path("notes/a.txt");

        let err = commit_payload(&payload_file, Some(&b"second"[..]), Some(b"one".to_vec()), failing_document);
        assert!(matches!(err, Err(StoreError::Io(_))));

        let loaded = store.find_with_payload("notes/a.txt").unwrap().unwrap();
        assert_eq!(loaded.document.size, 3);
        assert_eq!(loaded.inline.as_deref(), Some(&b"one"[..]));
    }

    #[test]
    fn failed_document_write_keeps_inline_payload_when_going_external() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.upsert(inline_record("clip.bin", b"small")).unwrap();
        let payload_file = store.payload_path("clip.bin");

        assert!(commit_payload(&payload_file, None, Some(b"small".to_vec()), failing_document).is_err());

        let loaded = store.find_with_payload("clip.bin").unwrap().unwrap();
        assert_eq!(loaded.inline.as_deref(), Some(&b"small"[..]));
    }

    #[test]
    fn failed_first_write_leaves_no_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        let payload_file = store.payload_path("new.txt");

        assert!(commit_payload(&payload_file, Some(&b"fresh"[..]), None, failing_document).is_err());
        assert!(!payload_file.exists());
        assert!(store.find("new.txt").unwrap().is_none());
    }

    #[test]
    fn missing_inline_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.upsert(inline_record("y.txt", b"y")).unwrap();
        fs::remove_file(store.payload_path("y.txt")).unwrap();

        assert!(matches!(
            store.find_with_payload("y.txt"),
            Err(StoreError::Corrupt(_))
        ));
    }
}
