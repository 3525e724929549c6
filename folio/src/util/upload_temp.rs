// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Temporary files written next to their final destination and renamed into place.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const TEMP_UPLOAD_PREFIX: &str = ".folio-upload-";
pub const TEMP_UPLOAD_SUFFIXES: [&str; 2] = [".upload", ".tmp"];

pub fn is_temp_upload_name(name: &str) -> bool {
    if name.starts_with(TEMP_UPLOAD_PREFIX) {
        return true;
    }
    TEMP_UPLOAD_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// A unique temp path in the same directory as `target`, so the final rename
/// never crosses a filesystem boundary.
pub fn temp_sibling(target: &Path) -> io::Result<PathBuf> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent")
    })?;
    let name = format!(
        "{}{}.upload",
        TEMP_UPLOAD_PREFIX,
        uuid::Uuid::new_v4().simple()
    );
    Ok(parent.join(name))
}

pub fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_sibling(target)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let result = fs::write(&temp_path, bytes).and_then(|_| fs::rename(&temp_path, target));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Stream `reader` into `target` and return the byte count.
pub fn copy_atomic(target: &Path, reader: &mut dyn Read) -> io::Result<u64> {
    let temp_path = temp_sibling(target)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let result = (|| {
        let mut file = File::create(&temp_path)?;
        let written = io::copy(reader, &mut file)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, target)?;
        Ok(written)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn temp_names_are_recognised() {
        let temp = temp_sibling(Path::new("/tmp/objects/ab/file")).expect("temp path");
        let name = temp.file_name().and_then(|n| n.to_str()).unwrap_or("");
        assert!(is_temp_upload_name(name));
        assert!(is_temp_upload_name("record.tmp"));
        assert!(!is_temp_upload_name("index.html"));
    }

    #[test]
    fn copy_atomic_leaves_only_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested").join("blob");
        let written =
            copy_atomic(&target, &mut Cursor::new(b"hello".to_vec())).expect("copy");
        assert_eq!(written, 5);
        assert_eq!(fs::read(&target).expect("read"), b"hello");

        let names: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .expect("list")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["blob".to_string()]);
    }
}
