// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub records_dir: PathBuf,
    pub objects_dir: PathBuf,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
}

impl RuntimePaths {
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        let root_path = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };

        ensure_dir_exists(&root_path)?;
        let root_canonical = canonicalize(&root_path, "runtime root")?;

        let records_dir = root_canonical.join("records");
        let objects_dir = root_canonical.join("objects");
        let static_dir = root_canonical.join("static");
        let templates_dir = root_canonical.join("templates");

        for dir in [&records_dir, &objects_dir, &static_dir, &templates_dir] {
            ensure_dir_exists(dir)?;
        }

        Ok(Self {
            config_file: root_canonical.join("config.yaml"),
            records_dir: canonicalize(&records_dir, "records directory")?,
            objects_dir: canonicalize(&objects_dir, "objects directory")?,
            static_dir: canonicalize(&static_dir, "static directory")?,
            templates_dir: canonicalize(&templates_dir, "templates directory")?,
            root: root_canonical,
        })
    }
}

fn canonicalize(path: &Path, label: &str) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|e| {
        ConfigError::ValidationError(format!(
            "Failed to canonicalize {} '{}': {}",
            label,
            path.display(),
            e
        ))
    })
}

fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Failed to create directory '{}': {}",
                path.display(),
                e
            ))
        })?;
    }

    if !path.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "Path '{}' exists but is not a directory",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_root_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        let paths = RuntimePaths::from_root(&root).unwrap();
        assert!(paths.records_dir.is_dir());
        assert!(paths.objects_dir.is_dir());
        assert!(paths.static_dir.is_dir());
        assert!(paths.templates_dir.is_dir());
        assert_eq!(paths.config_file, paths.root.join("config.yaml"));
    }

    #[test]
    fn from_root_rejects_file_in_place_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("records"), b"not a dir").unwrap();
        let err = RuntimePaths::from_root(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
