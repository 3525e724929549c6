// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::StoreError;
use crate::security::validate_new_file_path;
use crate::util::{copy_atomic, is_temp_upload_name};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// A file under an [`FsRoot`], addressed by its slash-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Plain directory holding files that bypass the content stores (static files, templates).
#[derive(Debug, Clone)]
pub struct FsRoot {
    root: PathBuf,
}

impl FsRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel: &str) -> Result<PathBuf, StoreError> {
        validate_new_file_path(rel, &self.root)
            .map_err(|msg| StoreError::Io(io::Error::new(io::ErrorKind::InvalidInput, msg)))
    }

    /// Write `reader` to `rel`, replacing any existing file. When `modified` is
    /// given it becomes the file's modification time.
    pub fn write(
        &self,
        rel: &str,
        reader: &mut dyn Read,
        modified: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        let target = self.resolve(rel)?;
        let written = copy_atomic(&target, reader)?;
        if let Some(modified) = modified {
            let file = OpenOptions::new().write(true).open(&target)?;
            file.set_modified(SystemTime::from(modified))?;
        }
        log::debug!("Wrote {} bytes to {}", written, target.display());
        Ok(written)
    }

    pub fn open(&self, rel: &str) -> Result<(File, FsEntry), StoreError> {
        let target = self.resolve(rel)?;
        let file = File::open(&target).map_err(|err| not_found_or_io(err, rel))?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound(rel.to_string()));
        }
        let entry = FsEntry {
            path: rel.to_string(),
            size: metadata.len(),
            modified: modified_time(&metadata),
        };
        Ok((file, entry))
    }

    pub fn stat(&self, rel: &str) -> Result<Option<FsEntry>, StoreError> {
        match self.open(rel) {
            Ok((_, entry)) => Ok(Some(entry)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn remove(&self, rel: &str) -> Result<(), StoreError> {
        let target = self.resolve(rel)?;
        fs::remove_file(&target).map_err(|err| not_found_or_io(err, rel))
    }

    /// Every regular file below the root, sorted by relative path.
    pub fn list(&self) -> Result<Vec<FsEntry>, StoreError> {
        let mut entries = Vec::new();
        if !self.root.exists() {
            return Ok(entries);
        }
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|err| {
                StoreError::Io(
                    err.into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory walk failed")),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_temp_upload_name(&name) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|part| part.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let metadata = entry.metadata().map_err(|err| {
                StoreError::Io(
                    err.into_io_error()
                        .unwrap_or_else(|| io::Error::other("metadata lookup failed")),
                )
            })?;
            entries.push(FsEntry {
                path: rel,
                size: metadata.len(),
                modified: modified_time(&metadata),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

fn modified_time(metadata: &fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn not_found_or_io(err: io::Error, rel: &str) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(rel.to_string())
    } else {
        StoreError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    #[test]
    fn write_preserves_modified_time() {
        let dir = tempfile::tempdir().unwrap();
        let root = FsRoot::new(dir.path());
        let when = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 8).unwrap();
        root.write("css/site.css", &mut Cursor::new(b"body{}".to_vec()), Some(when))
            .unwrap();

        let entry = root.stat("css/site.css").unwrap().unwrap();
        assert_eq!(entry.size, 6);
        assert_eq!(entry.modified, when);
    }

    #[test]
    fn list_is_sorted_and_skips_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = FsRoot::new(dir.path());
        root.write("b.js", &mut Cursor::new(b"b".to_vec()), None).unwrap();
        root.write("a/index.html", &mut Cursor::new(b"a".to_vec()), None)
            .unwrap();
        fs::write(dir.path().join(".folio-upload-x.upload"), b"partial").unwrap();

        let paths: Vec<_> = root.list().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["a/index.html".to_string(), "b.js".to_string()]);
    }

    #[test]
    fn remove_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = FsRoot::new(dir.path());
        assert!(matches!(root.remove("gone.css"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            root.write("../escape.css", &mut Cursor::new(b"x".to_vec()), None),
            Err(StoreError::Io(_))
        ));
    }
}
