// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::classify::{base_name, strip_extension};
use crate::content::{ContentError, ContentResult};
use log::warn;

/// Virtual root used when the bundle's own name cannot serve as one.
const FALLBACK_ROOT: &str = "bundle";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub path: String,
    /// True when the raw name was absolute or climbed above the bundle root
    /// and had to be placed under the bundle's virtual root.
    pub rerooted: bool,
}

/// Virtual root directory for a bundle: its file name without extension.
pub fn virtual_root(archive_name: &str) -> String {
    let stem = strip_extension(base_name(archive_name)).trim();
    let usable = !stem.is_empty()
        && stem != "."
        && stem != ".."
        && !stem.chars().any(|ch| ch.is_control());
    if usable {
        stem.to_string()
    } else {
        FALLBACK_ROOT.to_string()
    }
}

/// Turn a raw bundle entry name into a safe, relative logical path.
///
/// `.` and empty segments are dropped and `..` consumes its parent. Names that
/// are absolute or climb above the bundle root are re-rooted under
/// [`virtual_root`], which absorbs every excess `..`, so `../../etc/passwd`
/// in `evil.zip` becomes `evil/etc/passwd`. Names with control characters or
/// with nothing left after cleaning are rejected.
pub fn normalize_entry_path(raw: &str, archive_name: &str) -> ContentResult<NormalizedEntry> {
    if raw.chars().any(|ch| ch.is_control()) {
        return Err(ContentError::traversal_rejected(&raw.escape_debug().to_string()));
    }

    let unified = raw.replace('\\', "/");
    let mut rest = unified.as_str();
    let mut absolute = false;

    if let Some((drive, tail)) = rest.split_once(':')
        && drive.len() == 1
        && drive.chars().all(|ch| ch.is_ascii_alphabetic())
    {
        absolute = true;
        rest = tail;
    }
    if rest.starts_with('/') {
        absolute = true;
    }

    let mut segments: Vec<&str> = Vec::new();
    let mut escaped = false;
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    escaped = true;
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(ContentError::traversal_rejected(raw));
    }

    let relative = segments.join("/");
    if escaped || absolute {
        let path = format!("{}/{}", virtual_root(archive_name), relative);
        warn!(
            "Bundle entry '{}' escapes the bundle root; stored as '{}'",
            raw, path
        );
        return Ok(NormalizedEntry {
            path,
            rerooted: true,
        });
    }

    Ok(NormalizedEntry {
        path: relative,
        rerooted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentErrorKind;

    fn normalized(raw: &str) -> String {
        normalize_entry_path(raw, "evil.zip").unwrap().path
    }

    #[test]
    fn traversal_is_rerooted_under_bundle_name() {
        let entry = normalize_entry_path("../../etc/passwd", "evil.zip").unwrap();
        assert_eq!(entry.path, "evil/etc/passwd");
        assert!(entry.rerooted);
        assert!(!entry.path.starts_with(".."));

        assert_eq!(normalized("docs/../../../x.md"), "evil/x.md");
        assert_eq!(normalized("/etc/passwd"), "evil/etc/passwd");
        assert_eq!(normalized("C:\\Windows\\win.ini"), "evil/Windows/win.ini");
    }

    #[test]
    fn contained_dot_segments_are_collapsed() {
        let entry = normalize_entry_path("docs/./drafts/../intro.md", "site.zip").unwrap();
        assert_eq!(entry.path, "docs/intro.md");
        assert!(!entry.rerooted);
        assert_eq!(normalized("a\\b\\c.css"), "a/b/c.css");
        assert_eq!(normalized("a//b"), "a/b");
    }

    #[test]
    fn empty_results_are_rejected() {
        for raw in ["", "..", "../", "./.", "/"] {
            let err = normalize_entry_path(raw, "evil.zip").unwrap_err();
            assert_eq!(err.kind(), ContentErrorKind::TraversalRejected, "{:?}", raw);
        }
        let err = normalize_entry_path("a\u{0}b", "evil.zip").unwrap_err();
        assert_eq!(err.kind(), ContentErrorKind::TraversalRejected);
    }

    #[test]
    fn virtual_root_falls_back_for_odd_names() {
        assert_eq!(virtual_root("uploads/evil.zip"), "evil");
        assert_eq!(virtual_root("bundle.tar.zip"), "bundle.tar");
        assert_eq!(virtual_root(".zip"), ".zip");
        assert_eq!(virtual_root(""), "bundle");
        assert_eq!(virtual_root("...zip"), "bundle");
    }
}
