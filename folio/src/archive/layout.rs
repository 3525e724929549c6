// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ExportConfig;
use crate::content::Category;
use crate::content::classify::{base_name, strip_extension};

pub const ROOT_INDEX: &str = "index.html";

/// Directory prefixes inside an exported bundle.
///
/// ```text
/// index.html                  root index (chosen or synthesized)
/// <pages>/<path minus .md>.html   rendered markdown
/// <assets>/<path>             assets and markdown sources
/// <static>/<path>             static files
/// <templates>/<path>          template files
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    pub pages_prefix: String,
    pub assets_prefix: String,
    pub static_prefix: String,
    pub templates_prefix: String,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

impl BundleLayout {
    pub fn from_config(export: &ExportConfig) -> Self {
        Self {
            pages_prefix: export.pages_prefix.clone(),
            assets_prefix: export.assets_prefix.clone(),
            static_prefix: export.static_prefix.clone(),
            templates_prefix: export.templates_prefix.clone(),
        }
    }

    pub fn page_entry(&self, markdown_path: &str) -> String {
        format!("{}/{}.html", self.pages_prefix, strip_extension(markdown_path))
    }

    /// Page entry that keeps the source extension: `docs/intro.MD` becomes
    /// `pages/docs/intro.MD.html`.
    pub fn source_page_entry(&self, markdown_path: &str) -> String {
        format!("{}/{}.html", self.pages_prefix, markdown_path)
    }

    pub fn asset_entry(&self, path: &str) -> String {
        format!("{}/{}", self.assets_prefix, path)
    }

    pub fn static_entry(&self, path: &str) -> String {
        format!("{}/{}", self.static_prefix, path)
    }

    pub fn template_entry(&self, path: &str) -> String {
        format!("{}/{}", self.templates_prefix, path)
    }

    /// Undo the export prefix for an imported entry of the given category so
    /// a bundle re-imports into the logical paths it was exported from.
    pub fn strip_import_prefix<'a>(&self, path: &'a str, category: Category) -> &'a str {
        let prefix = match category {
            Category::Markdown | Category::Asset | Category::Archive => &self.assets_prefix,
            Category::Static => &self.static_prefix,
            Category::Template => &self.templates_prefix,
        };
        match path
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        }
    }
}

/// `../` repeated once per directory level of a bundle entry, for links back to the root.
pub fn root_prefix(entry: &str) -> String {
    "../".repeat(entry.matches('/').count())
}

/// Whether `path` names an index page of the given kind (`index.html` or `index.md`).
pub fn is_index_name(path: &str, category: Category) -> bool {
    let name = base_name(path);
    match category {
        Category::Static => name.eq_ignore_ascii_case("index.html"),
        Category::Markdown => name.eq_ignore_ascii_case("index.md"),
        _ => false,
    }
}

/// Sort key preferring shallow paths, then lexical order.
pub fn depth_first_key(path: &str) -> (usize, &str) {
    (path.matches('/').count(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_use_configured_prefixes() {
        let layout = BundleLayout::default();
        assert_eq!(layout.page_entry("docs/intro.md"), "pages/docs/intro.html");
        assert_eq!(
            layout.source_page_entry("docs/intro.MD"),
            "pages/docs/intro.MD.html"
        );
        assert_eq!(layout.asset_entry("img/a.png"), "files/img/a.png");
        assert_eq!(layout.static_entry("site.css"), "static/site.css");
        assert_eq!(layout.template_entry("base.tmpl"), "templates/base.tmpl");
    }

    #[test]
    fn import_prefix_stripping_matches_category() {
        let layout = BundleLayout::default();
        assert_eq!(
            layout.strip_import_prefix("files/img/a.png", Category::Asset),
            "img/a.png"
        );
        assert_eq!(
            layout.strip_import_prefix("files/docs/intro.md", Category::Markdown),
            "docs/intro.md"
        );
        assert_eq!(
            layout.strip_import_prefix("static/site.css", Category::Static),
            "site.css"
        );
        assert_eq!(
            layout.strip_import_prefix("static/site.css", Category::Template),
            "static/site.css"
        );
        assert_eq!(
            layout.strip_import_prefix("filesystem/a.png", Category::Asset),
            "filesystem/a.png"
        );
        assert_eq!(layout.strip_import_prefix("files/", Category::Asset), "files/");
    }

    #[test]
    fn root_prefix_counts_levels() {
        assert_eq!(root_prefix("index.html"), "");
        assert_eq!(root_prefix("pages/docs/intro.html"), "../../");
    }

    #[test]
    fn index_names() {
        assert!(is_index_name("index.html", Category::Static));
        assert!(is_index_name("about/INDEX.md", Category::Markdown));
        assert!(!is_index_name("index.md", Category::Static));
        assert!(!is_index_name("reindex.html", Category::Static));
    }
}
