// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::entry_path::normalize_entry_path;
use super::layout::BundleLayout;
use super::zip_error;
use crate::content::{Category, ContentResult, EntryMetadata, classify};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use serde::Serialize;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Receiver for unpacked bundle entries.
pub trait EntrySink {
    /// Store one entry; returns the category it was dispatched as.
    fn accept(&self, meta: EntryMetadata, reader: &mut dyn Read) -> ContentResult<Category>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub markdown: usize,
    pub assets: usize,
    pub static_files: usize,
    pub templates: usize,
    /// Bundles found inside the bundle; kept as opaque assets.
    pub nested_archives: usize,
    pub directories_skipped: usize,
    pub rerooted: usize,
}

impl ImportReport {
    pub fn files(&self) -> usize {
        self.markdown + self.assets + self.static_files + self.templates + self.nested_archives
    }

    fn count(&mut self, category: Category) {
        match category {
            Category::Markdown => self.markdown += 1,
            Category::Asset => self.assets += 1,
            Category::Static => self.static_files += 1,
            Category::Template => self.templates += 1,
            Category::Archive => self.nested_archives += 1,
        }
    }
}

/// Unpack `archive` entry by entry into `sink`.
///
/// Entries are processed in bundle order; the first failure aborts the import
/// and is returned with the entry name attached. Entries already handed to the
/// sink stay applied.
pub fn import_archive<R: Read + Seek>(
    archive: R,
    archive_name: &str,
    layout: &BundleLayout,
    sink: &dyn EntrySink,
) -> ContentResult<ImportReport> {
    let mut archive = ZipArchive::new(archive).map_err(zip_error)?;
    let mut report = ImportReport::default();
    info!(
        "Importing bundle '{}' ({} entries)",
        archive_name,
        archive.len()
    );

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(zip_error)?;
        if file.is_dir() {
            report.directories_skipped += 1;
            continue;
        }

        let raw_name = file.name().to_string();
        let normalized = normalize_entry_path(&raw_name, archive_name)?;
        if normalized.rerooted {
            report.rerooted += 1;
        }
        let category = classify(&normalized.path);
        let logical = layout.strip_import_prefix(&normalized.path, category);
        let meta = EntryMetadata::new(
            logical,
            file.size(),
            Some(zip_time_to_utc(file.last_modified())),
        );
        debug!(
            "Bundle entry '{}' -> '{}' ({}, {} bytes)",
            raw_name, meta.path, category, meta.size
        );

        let dispatched = sink
            .accept(meta, &mut file)
            .map_err(|err| err.context(format!("bundle entry '{}'", raw_name)))?;
        report.count(dispatched);
    }

    info!(
        "Imported bundle '{}': {} files, {} directories skipped",
        archive_name,
        report.files(),
        report.directories_skipped
    );
    Ok(report)
}

/// Zip timestamps carry no zone; they are read back as UTC, matching export.
pub fn zip_time_to_utc(time: zip::DateTime) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )
    .single()
    .unwrap_or_else(Utc::now)
}
