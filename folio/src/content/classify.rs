// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a file is, judged from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Bundle container, unpacked on upload.
    Archive,
    /// Stored as content and rendered to HTML on read.
    Markdown,
    /// Served byte-for-byte from the static root.
    Static,
    /// Server-side composition fragment, kept in the template root.
    Template,
    /// Opaque binary stored as content.
    Asset,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Archive => "archive",
            Category::Markdown => "markdown",
            Category::Static => "static",
            Category::Template => "template",
            Category::Asset => "asset",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

const ARCHIVE_EXTENSIONS: [&str; 1] = ["zip"];
const MARKDOWN_EXTENSIONS: [&str; 1] = ["md"];
const STATIC_EXTENSIONS: [&str; 5] = ["html", "css", "js", "ico", "svg"];
const TEMPLATE_EXTENSIONS: [&str; 2] = ["tmpl", "gohtml"];

/// Classify a file name or slash-separated path by its extension.
///
/// Total and case-insensitive. Names without an extension, and dotfiles such
/// as `.zip`, fall through to [`Category::Asset`].
pub fn classify(name: &str) -> Category {
    let Some(ext) = extension(name) else {
        return Category::Asset;
    };
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();

    if ARCHIVE_EXTENSIONS.contains(&ext) {
        Category::Archive
    } else if MARKDOWN_EXTENSIONS.contains(&ext) {
        Category::Markdown
    } else if STATIC_EXTENSIONS.contains(&ext) {
        Category::Static
    } else if TEMPLATE_EXTENSIONS.contains(&ext) {
        Category::Template
    } else {
        Category::Asset
    }
}

/// Extension of the last path segment, without the dot.
pub fn extension(name: &str) -> Option<&str> {
    let base = base_name(name);
    let dot = base.rfind('.')?;
    if dot == 0 || dot + 1 == base.len() {
        return None;
    }
    Some(&base[dot + 1..])
}

/// Last segment of a slash or backslash separated path.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// `docs/intro.md` -> `docs/intro`; names without an extension are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match extension(name) {
        Some(ext) => &name[..name.len() - ext.len() - 1],
        None => name,
    }
}
