// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::warn;
use std::path::{Component, Path, PathBuf};

/// Validates a relative path for a file under `root` (the file need not exist).
/// Returns the joined target path, or a message describing why it was refused.
pub fn validate_new_file_path(filename: &str, root: &Path) -> Result<PathBuf, String> {
    if filename.is_empty() {
        return Err("Empty filename not allowed".to_string());
    }

    if filename.chars().any(|ch| ch.is_control()) {
        return Err("Invalid filename: control characters".to_string());
    }

    if has_traversal(filename) {
        return Err("Invalid filename: path traversal or absolute paths detected".to_string());
    }

    // URL decode the filename to catch encoded traversal attempts
    let decoded_filename = match urlencoding::decode(filename) {
        Ok(decoded) => decoded,
        Err(_) => return Err("Invalid filename: could not decode URL".to_string()),
    };

    if has_traversal(decoded_filename.as_ref()) {
        warn!(
            "🚨 SECURITY: Encoded traversal in file path rejected: {}",
            filename
        );
        return Err(
            "Invalid filename: encoded path traversal or absolute paths detected".to_string(),
        );
    }

    let target_path = root.join(filename);
    match target_path.strip_prefix(root) {
        Ok(_) => Ok(target_path),
        Err(_) => Err("Target path is outside root directory".to_string()),
    }
}

fn has_traversal(candidate: &str) -> bool {
    if candidate.starts_with('/') || candidate.contains('\\') {
        return true;
    }
    if candidate
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return true;
    }
    Path::new(candidate)
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
}
