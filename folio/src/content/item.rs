// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::store::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Inline,
    External,
}

impl Placement {
    /// Payloads strictly larger than `threshold` are stored externally.
    pub fn for_size(size: u64, threshold: u64) -> Self {
        if size > threshold {
            Placement::External
        } else {
            Placement::Inline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Inline => "inline",
            Placement::External => "external",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where an item's bytes live. Inline bytes are held by the record store and
/// loaded on demand, never carried on the item itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline,
    External(ObjectKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub path: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub mime_type: String,
    pub is_markdown: bool,
    pub payload: Payload,
}

impl ContentItem {
    pub fn placement(&self) -> Placement {
        match self.payload {
            Payload::Inline => Placement::Inline,
            Payload::External(_) => Placement::External,
        }
    }

    pub fn object_key(&self) -> Option<&ObjectKey> {
        match &self.payload {
            Payload::External(key) => Some(key),
            Payload::Inline => None,
        }
    }
}

/// Name, size and source time of an incoming file, as passed to the shared dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub path: String,
    pub size: u64,
    /// Source time from the uploader; `None` means "now".
    pub modified: Option<DateTime<Utc>>,
}

impl EntryMetadata {
    pub fn new(path: impl Into<String>, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }

    pub fn modified_or_now(&self) -> DateTime<Utc> {
        self.modified.unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_boundary_is_strictly_greater() {
        let threshold = 15 * 1024 * 1024;
        assert_eq!(Placement::for_size(1, threshold), Placement::Inline);
        assert_eq!(Placement::for_size(threshold - 1, threshold), Placement::Inline);
        assert_eq!(Placement::for_size(threshold, threshold), Placement::Inline);
        assert_eq!(Placement::for_size(threshold + 1, threshold), Placement::External);
    }
}
