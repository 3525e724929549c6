// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::layout::{BundleLayout, ROOT_INDEX, depth_first_key, is_index_name, root_prefix};
use super::zip_error;
use crate::content::{Category, ContentError, ContentResult, ContentSummary, PlacementEngine};
use crate::store::{FsEntry, FsRoot};
use crate::templates::{
    EXPORT_INDEX_TEMPLATE, IndexLink, IndexPageContext, PageShell, TemplateEngine,
    render_page_shell,
};
use chrono::{DateTime, Datelike, Timelike, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Everything an export reads from.
pub struct ExportSources<'a> {
    pub engine: &'a PlacementEngine,
    pub static_root: &'a FsRoot,
    pub template_root: &'a FsRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "path")]
pub enum IndexSource {
    Static(String),
    Page(String),
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub pages: usize,
    pub assets: usize,
    pub static_files: usize,
    pub templates: usize,
    pub index: IndexSource,
}

struct BundleWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> BundleWriter<W> {
    fn add(
        &mut self,
        name: &str,
        modified: DateTime<Utc>,
        reader: &mut dyn Read,
    ) -> ContentResult<u64> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(utc_to_zip_time(modified));
        self.zip.start_file(name, options).map_err(zip_error)?;
        let written = io::copy(reader, &mut self.zip)
            .map_err(|err| ContentError::backend(format!("writing bundle entry '{}'", name), err))?;
        debug!("Bundle entry '{}' ({} bytes)", name, written);
        Ok(written)
    }
}

/// Pack all content, static files and templates into a zip bundle.
///
/// Markdown is rendered into standalone pages (its source travels too, under
/// the assets prefix). The bundle root always gets an `index.html`: the
/// shallowest static `index.html`, else the shallowest markdown `index.md`,
/// else a synthesized listing.
pub fn export_archive<W: Write + Seek>(
    writer: W,
    sources: &ExportSources<'_>,
    layout: &BundleLayout,
    templates: &dyn TemplateEngine,
    site_title: &str,
) -> ContentResult<(W, ExportReport)> {
    let items = sources.engine.list_all()?;
    let static_files = sources.static_root.list()?;
    let template_files = sources.template_root.list()?;
    let index = choose_index(&static_files, &items);
    let page_entries = assign_page_entries(&items, layout)?;
    info!(
        "Exporting {} items, {} static files, {} templates (index: {:?})",
        items.len(),
        static_files.len(),
        template_files.len(),
        index
    );

    let mut bundle = BundleWriter {
        zip: ZipWriter::new(writer),
    };
    let mut report = ExportReport {
        pages: 0,
        assets: 0,
        static_files: 0,
        templates: 0,
        index: index.clone(),
    };
    let mut index_page = IndexPageContext::new(
        site_title,
        &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    for entry in &static_files {
        copy_fs_entry(&mut bundle, sources.static_root, entry, &layout.static_entry(&entry.path))?;
        report.static_files += 1;
    }
    for entry in &template_files {
        copy_fs_entry(
            &mut bundle,
            sources.template_root,
            entry,
            &layout.template_entry(&entry.path),
        )?;
        report.templates += 1;
    }

    for item in &items {
        let (mut reader, _) = sources.engine.open(&item.path)?;
        let asset_entry = layout.asset_entry(&item.path);
        bundle.add(&asset_entry, item.modified, &mut reader)?;

        if item.category == Category::Markdown {
            let page_entry = page_entries
                .get(&item.path)
                .cloned()
                .unwrap_or_else(|| layout.page_entry(&item.path));
            let (page, title) = render_page(sources.engine, item, site_title, &page_entry)?;
            bundle.add(&page_entry, item.modified, &mut Cursor::new(page.into_bytes()))?;
            index_page.add_page(IndexLink {
                href: page_entry,
                title,
                size: item.size,
            });
            report.pages += 1;
        } else {
            index_page.add_file(IndexLink {
                title: item.path.clone(),
                href: asset_entry,
                size: item.size,
            });
            report.assets += 1;
        }
    }

    match &index {
        IndexSource::Static(path) => {
            let (mut file, entry) = sources.static_root.open(path)?;
            bundle.add(ROOT_INDEX, entry.modified, &mut file)?;
        }
        IndexSource::Page(path) => {
            let item = items
                .iter()
                .find(|item| &item.path == path)
                .ok_or_else(|| ContentError::not_found(path))?;
            let (page, _) = render_page(sources.engine, item, site_title, ROOT_INDEX)?;
            bundle.add(ROOT_INDEX, item.modified, &mut Cursor::new(page.into_bytes()))?;
        }
        IndexSource::Synthesized => {
            let html = templates
                .render(EXPORT_INDEX_TEMPLATE, index_page.to_value())
                .map_err(|err| ContentError::backend("rendering fallback index", err))?;
            bundle.add(ROOT_INDEX, Utc::now(), &mut Cursor::new(html.into_bytes()))?;
        }
    }

    let writer = bundle.zip.finish().map_err(zip_error)?;
    info!(
        "Export finished: {} pages, {} assets, {} static files, {} templates",
        report.pages, report.assets, report.static_files, report.templates
    );
    Ok((writer, report))
}

/// Page entry name for every markdown item.
///
/// Paths that differ only in the case of their extension (`a.md`, `a.MD`)
/// would share `pages/a.html`; each of those keeps its source extension
/// instead. A name that is still shared fails the export.
fn assign_page_entries(
    items: &[ContentSummary],
    layout: &BundleLayout,
) -> ContentResult<HashMap<String, String>> {
    let markdown: Vec<&ContentSummary> = items
        .iter()
        .filter(|item| item.category == Category::Markdown)
        .collect();
    let mut plain_counts: HashMap<String, usize> = HashMap::new();
    for item in &markdown {
        *plain_counts.entry(layout.page_entry(&item.path)).or_default() += 1;
    }

    let mut entries = HashMap::with_capacity(markdown.len());
    let mut taken = HashSet::with_capacity(markdown.len());
    for item in markdown {
        let plain = layout.page_entry(&item.path);
        let entry = if plain_counts.get(&plain).copied().unwrap_or(0) > 1 {
            let entry = layout.source_page_entry(&item.path);
            warn!(
                "Page name '{}' is shared by several sources; '{}' exported as '{}'",
                plain, item.path, entry
            );
            entry
        } else {
            plain
        };
        if !taken.insert(entry.clone()) {
            return Err(ContentError::invalid_input(format!(
                "page for '{}' collides with another page at bundle entry '{}'",
                item.path, entry
            )));
        }
        entries.insert(item.path.clone(), entry);
    }
    Ok(entries)
}

fn choose_index(static_files: &[FsEntry], items: &[ContentSummary]) -> IndexSource {
    let static_candidate = static_files
        .iter()
        .filter(|entry| is_index_name(&entry.path, Category::Static))
        .min_by(|a, b| depth_first_key(&a.path).cmp(&depth_first_key(&b.path)));
    if let Some(entry) = static_candidate {
        return IndexSource::Static(entry.path.clone());
    }

    let page_candidate = items
        .iter()
        .filter(|item| item.category == Category::Markdown)
        .filter(|item| is_index_name(&item.path, Category::Markdown))
        .min_by(|a, b| depth_first_key(&a.path).cmp(&depth_first_key(&b.path)));
    match page_candidate {
        Some(item) => IndexSource::Page(item.path.clone()),
        None => IndexSource::Synthesized,
    }
}

fn render_page(
    engine: &PlacementEngine,
    item: &ContentSummary,
    site_title: &str,
    entry_name: &str,
) -> ContentResult<(String, String)> {
    let rendered = engine.render(&item.path)?;
    let title = rendered.title.unwrap_or_else(|| item.path.clone());
    let modified = rendered.last_modified.format("%Y-%m-%d %H:%M UTC").to_string();
    let root = root_prefix(entry_name);
    let page = render_page_shell(&PageShell {
        title: &title,
        site_title,
        body: &rendered.html,
        modified: &modified,
        root: &root,
    })?;
    Ok((page, title))
}

fn copy_fs_entry<W: Write + Seek>(
    bundle: &mut BundleWriter<W>,
    root: &FsRoot,
    entry: &FsEntry,
    entry_name: &str,
) -> ContentResult<()> {
    let (mut file, current) = root.open(&entry.path)?;
    bundle.add(entry_name, current.modified, &mut file)?;
    Ok(())
}

/// Zip stores local time with two-second resolution from 1980 on; earlier or
/// later times are clamped to the format's default.
pub fn utc_to_zip_time(time: DateTime<Utc>) -> zip::DateTime {
    let year = u16::try_from(time.year()).unwrap_or(0);
    match zip::DateTime::from_date_and_time(
        year,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    ) {
        Ok(converted) => converted,
        Err(_) => {
            warn!("Timestamp {} is outside the zip range; using default", time);
            zip::DateTime::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::import::zip_time_to_utc;
    use crate::content::item::Placement;
    use chrono::TimeZone;

    fn summary(path: &str, category: Category) -> ContentSummary {
        ContentSummary {
            path: path.to_string(),
            size: 1,
            modified: Utc::now(),
            mime_type: "text/markdown".to_string(),
            category,
            placement: Placement::Inline,
        }
    }

    fn fs_entry(path: &str) -> FsEntry {
        FsEntry {
            path: path.to_string(),
            size: 1,
            modified: Utc::now(),
        }
    }

    #[test]
    fn static_index_wins_and_shallow_paths_first() {
        let statics = vec![fs_entry("blog/index.html"), fs_entry("index.html")];
        let items = vec![summary("index.md", Category::Markdown)];
        assert_eq!(
            choose_index(&statics, &items),
            IndexSource::Static("index.html".to_string())
        );
    }

    #[test]
    fn markdown_index_used_when_no_static_index() {
        let statics = vec![fs_entry("site.css")];
        let items = vec![
            summary("z/index.md", Category::Markdown),
            summary("a/b/index.md", Category::Markdown),
            summary("index.md.png", Category::Asset),
        ];
        assert_eq!(
            choose_index(&statics, &items),
            IndexSource::Page("z/index.md".to_string())
        );
        assert_eq!(choose_index(&[], &[]), IndexSource::Synthesized);
    }

    #[test]
    fn page_entries_that_differ_in_extension_case_keep_the_extension() {
        let layout = BundleLayout::default();
        let items = vec![
            summary("notes/a.MD", Category::Markdown),
            summary("notes/a.md", Category::Markdown),
            summary("notes/b.md", Category::Markdown),
            summary("notes/a.png", Category::Asset),
        ];
        let entries = assign_page_entries(&items, &layout).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries["notes/a.MD"], "pages/notes/a.MD.html");
        assert_eq!(entries["notes/a.md"], "pages/notes/a.md.html");
        assert_eq!(entries["notes/b.md"], "pages/notes/b.html");
    }

    #[test]
    fn page_entries_that_still_collide_fail() {
        let layout = BundleLayout::default();
        let items = vec![
            summary("a.md", Category::Markdown),
            summary("a.Md", Category::Markdown),
            summary("a.md.md", Category::Markdown),
        ];
        let err = assign_page_entries(&items, &layout).unwrap_err();
        assert_eq!(err.kind(), crate::content::ContentErrorKind::InvalidInput);
    }

    #[test]
    fn zip_time_keeps_even_seconds() {
        let time = Utc.with_ymd_and_hms(2022, 12, 31, 23, 59, 58).unwrap();
        let converted = utc_to_zip_time(time);
        assert_eq!(zip_time_to_utc(converted), time);

        let ancient = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            zip_time_to_utc(utc_to_zip_time(ancient)),
            Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
