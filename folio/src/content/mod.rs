// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod classify;
pub mod engine;
pub mod error;
pub mod item;
mod listing;
pub mod sniff;

pub use classify::{Category, base_name, classify};
pub use engine::{ContentReader, NewContent, PlacementEngine, RenderedContent, canonical_path};
pub use error::{ContentError, ContentErrorKind, ContentResult};
pub use item::{ContentItem, EntryMetadata, Payload, Placement};
pub use listing::ContentSummary;
pub use sniff::{ExactReader, SNIFF_WINDOW, SniffedReader};
