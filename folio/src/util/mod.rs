// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod mime_helper;
pub mod test_fixtures;
pub mod upload_temp;

pub use mime_helper::{FALLBACK_MIME, MARKDOWN_MIME, detect_mime_type, guess_mime_type};
pub use upload_temp::{
    TEMP_UPLOAD_PREFIX, TEMP_UPLOAD_SUFFIXES, copy_atomic, is_temp_upload_name, temp_sibling,
    write_atomic,
};
