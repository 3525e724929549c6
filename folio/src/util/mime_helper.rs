// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub const MARKDOWN_MIME: &str = "text/markdown";
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Detect MIME type using content-based detection (infer) with fallback to extension-based (mime_guess)
pub fn detect_mime_type(name: &str, prefix: &[u8]) -> String {
    if let Some(kind) = infer::get(prefix) {
        return kind.mime_type().to_string();
    }

    if let Some(mime_type) = mime_guess::from_path(name).first() {
        return mime_type.to_string();
    }

    FALLBACK_MIME.to_string()
}

/// Extension-only guess, for files served from disk roots without sniffing.
pub fn guess_mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
