// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::item::{ContentItem, Payload, Placement};
use crate::store::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted shape of a content record. Kept separate from [`ContentItem`] so
/// the on-disk schema can evolve without touching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDocument {
    pub path: String,
    pub size: u64,
    /// RFC 3339, UTC.
    pub last_modified: String,
    pub mime: String,
    #[serde(default)]
    pub is_markdown: bool,
    pub placement: String,
    #[serde(default)]
    pub object_key: Option<String>,
}

/// A record as handed to a store: metadata plus the inline payload, if any.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub document: RecordDocument,
    pub inline: Option<Vec<u8>>,
}

#[derive(Debug)]
pub enum RecordError {
    InvalidTimestamp(String),
    UnknownPlacement(String),
    MissingObjectKey,
    UnexpectedObjectKey,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::InvalidTimestamp(raw) => write!(f, "invalid last_modified '{}'", raw),
            RecordError::UnknownPlacement(raw) => write!(f, "unknown placement '{}'", raw),
            RecordError::MissingObjectKey => write!(f, "external record without object key"),
            RecordError::UnexpectedObjectKey => write!(f, "inline record carries an object key"),
        }
    }
}

impl std::error::Error for RecordError {}

const PLACEMENT_INLINE: &str = "inline";
const PLACEMENT_EXTERNAL: &str = "external";

pub fn encode_item(item: &ContentItem) -> RecordDocument {
    let (placement, object_key) = match &item.payload {
        Payload::Inline => (PLACEMENT_INLINE, None),
        Payload::External(key) => (PLACEMENT_EXTERNAL, Some(key.as_str().to_string())),
    };
    RecordDocument {
        path: item.path.clone(),
        size: item.size,
        last_modified: item.last_modified.to_rfc3339(),
        mime: item.mime_type.clone(),
        is_markdown: item.is_markdown,
        placement: placement.to_string(),
        object_key,
    }
}

pub fn decode_item(document: &RecordDocument) -> Result<ContentItem, RecordError> {
    let last_modified = DateTime::parse_from_rfc3339(&document.last_modified)
        .map_err(|_| RecordError::InvalidTimestamp(document.last_modified.clone()))?
        .with_timezone(&Utc);

    let payload = match (document.placement.as_str(), document.object_key.as_ref()) {
        (PLACEMENT_INLINE, None) => Payload::Inline,
        (PLACEMENT_INLINE, Some(_)) => return Err(RecordError::UnexpectedObjectKey),
        (PLACEMENT_EXTERNAL, Some(key)) => Payload::External(ObjectKey::from_stored(key.clone())),
        (PLACEMENT_EXTERNAL, None) => return Err(RecordError::MissingObjectKey),
        (other, _) => return Err(RecordError::UnknownPlacement(other.to_string())),
    };

    Ok(ContentItem {
        path: document.path.clone(),
        size: document.size,
        last_modified,
        mime_type: document.mime.clone(),
        is_markdown: document.is_markdown,
        payload,
    })
}

impl RecordDocument {
    pub fn placement(&self) -> Option<Placement> {
        match self.placement.as_str() {
            PLACEMENT_INLINE => Some(Placement::Inline),
            PLACEMENT_EXTERNAL => Some(Placement::External),
            _ => None,
        }
    }

    pub fn object_key(&self) -> Option<ObjectKey> {
        self.object_key.clone().map(ObjectKey::from_stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_item(payload: Payload) -> ContentItem {
        ContentItem {
            path: "docs/intro.md".to_string(),
            size: 42,
            last_modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            mime_type: "text/markdown".to_string(),
            is_markdown: true,
            payload,
        }
    }

    #[test]
    fn external_item_keeps_object_key() {
        let key = ObjectKey::new_revision("docs/intro.md");
        let item = sample_item(Payload::External(key.clone()));
        let document = encode_item(&item);
        assert_eq!(document.placement, "external");
        assert_eq!(document.object_key.as_deref(), Some(key.as_str()));

        let decoded = decode_item(&document).expect("decode");
        assert_eq!(decoded, item);
    }

    #[test]
    fn decode_rejects_inconsistent_placement() {
        let mut document = encode_item(&sample_item(Payload::Inline));
        document.object_key = Some("docs/intro.md#abc".to_string());
        assert!(matches!(
            decode_item(&document),
            Err(RecordError::UnexpectedObjectKey)
        ));

        document.placement = "external".to_string();
        document.object_key = None;
        assert!(matches!(
            decode_item(&document),
            Err(RecordError::MissingObjectKey)
        ));

        document.placement = "cloud".to_string();
        assert!(matches!(
            decode_item(&document),
            Err(RecordError::UnknownPlacement(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_timestamp() {
        let mut document = encode_item(&sample_item(Payload::Inline));
        document.last_modified = "yesterday".to_string();
        assert!(matches!(
            decode_item(&document),
            Err(RecordError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn document_survives_ron() {
        let document = encode_item(&sample_item(Payload::Inline));
        let serialized = ron::ser::to_string_pretty(&document, ron::ser::PrettyConfig::new())
            .expect("serialize");
        let parsed: RecordDocument = ron::from_str(&serialized).expect("parse");
        assert_eq!(parsed, document);
    }
}
