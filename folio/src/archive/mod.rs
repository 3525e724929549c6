// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Zip bundle transcoding: unpack into the content set, pack it back out.

pub mod entry_path;
pub mod export;
pub mod import;
pub mod layout;

pub use entry_path::{NormalizedEntry, normalize_entry_path, virtual_root};
pub use export::{ExportReport, ExportSources, IndexSource, export_archive};
pub use import::{EntrySink, ImportReport, import_archive};
pub use layout::{BundleLayout, ROOT_INDEX};

use crate::content::{ContentError, ContentErrorKind};
use zip::result::ZipError;

pub(crate) fn zip_error(err: ZipError) -> ContentError {
    match err {
        ZipError::Io(io) => ContentError::backend("bundle I/O failed", io),
        ZipError::FileNotFound => ContentError::new(ContentErrorKind::NotFound, "bundle entry not found"),
        other => ContentError::invalid_input(format!("not a usable zip bundle: {}", other)),
    }
}
