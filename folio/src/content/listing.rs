// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::classify::{Category, classify};
use super::engine::PlacementEngine;
use super::error::{ContentError, ContentResult};
use super::item::Placement;
use crate::store::record::decode_item;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload-free view of a stored item, for administrative listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSummary {
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub mime_type: String,
    pub category: Category,
    pub placement: Placement,
}

impl PlacementEngine {
    /// Every stored item, sorted by path. Never touches payloads.
    pub fn list_all(&self) -> ContentResult<Vec<ContentSummary>> {
        let documents = self.records().find_all()?;
        let mut summaries = documents
            .iter()
            .map(|document| {
                let item = decode_item(document).map_err(|err| {
                    ContentError::backend(format!("record for '{}'", document.path), err)
                })?;
                Ok(ContentSummary {
                    category: classify(&item.path),
                    placement: item.placement(),
                    path: item.path,
                    size: item.size,
                    modified: item.last_modified,
                    mime_type: item.mime_type,
                })
            })
            .collect::<ContentResult<Vec<_>>>()?;
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(summaries)
    }
}
