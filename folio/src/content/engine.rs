// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Placement engine: one logical content API over the record and object stores.

use super::classify::{Category, classify, extension, strip_extension};
use super::error::{ContentError, ContentResult};
use super::item::{ContentItem, Payload, Placement};
use crate::markdown::MarkdownRenderer;
use crate::store::record::{decode_item, encode_item};
use crate::store::{ObjectKey, ObjectReader, ObjectStore, RecordDocument, RecordStore, StoreError, StoredRecord};
use crate::util::FALLBACK_MIME;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::io::{Cursor, Read};
use std::sync::Arc;

/// Caller-supplied description of a payload about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    pub path: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub mime_type: String,
    pub is_markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub html: String,
    pub title: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// Reader over an item's bytes. External payloads are streamed, not buffered.
pub type ContentReader = ObjectReader;

const OPEN_ATTEMPTS: usize = 8;

pub struct PlacementEngine {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    renderer: MarkdownRenderer,
    threshold: u64,
}

impl PlacementEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        threshold: u64,
    ) -> Self {
        Self {
            records,
            objects,
            renderer: MarkdownRenderer::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Store `reader` under `content.path`, replacing whatever was there.
    ///
    /// `reader` must yield exactly `content.size` bytes. The record swap is a
    /// single upsert, so readers see either the old item or the new one.
    pub fn store(&self, content: NewContent, reader: &mut dyn Read) -> ContentResult<ContentItem> {
        let path = canonical_path(&content.path)?;
        if content.size == 0 {
            return Err(ContentError::invalid_input(format!(
                "size must be greater than zero for '{}'",
                path
            )));
        }
        let path_is_markdown = classify(&path) == Category::Markdown;
        if content.is_markdown != path_is_markdown {
            return Err(ContentError::invalid_input(format!(
                "'{}' {} markdown by name but was submitted with is_markdown={}",
                path,
                if path_is_markdown { "is" } else { "is not" },
                content.is_markdown
            )));
        }

        let placement = Placement::for_size(content.size, self.threshold);
        let mime_type = if content.mime_type.trim().is_empty() {
            FALLBACK_MIME.to_string()
        } else {
            content.mime_type
        };
        debug!(
            "Placing '{}' ({} bytes) {} (threshold {})",
            path, content.size, placement, self.threshold
        );

        let mut bounded = reader.take(content.size + 1);
        let (payload, inline) = match placement {
            Placement::Inline => {
                let mut buffer = Vec::with_capacity(content.size as usize);
                bounded.read_to_end(&mut buffer)?;
                check_length(&path, content.size, buffer.len() as u64)?;
                (Payload::Inline, Some(buffer))
            }
            Placement::External => {
                let key = ObjectKey::new_revision(&path);
                let written = self.objects.put(&key, &mut bounded)?;
                if let Err(err) = check_length(&path, content.size, written) {
                    self.discard_object(&key);
                    return Err(err);
                }
                (Payload::External(key), None)
            }
        };

        let item = ContentItem {
            path: path.clone(),
            size: content.size,
            last_modified: content.last_modified,
            mime_type,
            is_markdown: content.is_markdown,
            payload,
        };

        let record = StoredRecord {
            document: encode_item(&item),
            inline,
        };
        let previous = match self.records.upsert(record) {
            Ok(previous) => previous,
            Err(err) => {
                if let Some(key) = item.object_key() {
                    self.discard_object(key);
                }
                return Err(ContentError::from(err).context(format!("storing '{}'", path)));
            }
        };

        match &previous {
            Some(old) => info!(
                "Replaced '{}' ({} bytes, {} -> {})",
                path,
                item.size,
                old.placement,
                item.placement()
            ),
            None => info!(
                "Stored '{}' ({} bytes, {})",
                path,
                item.size,
                item.placement()
            ),
        }

        if let Some(old_key) = previous.as_ref().and_then(RecordDocument::object_key)
            && item.object_key() != Some(&old_key)
        {
            self.discard_object(&old_key);
        }

        Ok(item)
    }

    /// Metadata lookup; `None` when nothing is stored at `path`.
    pub fn get(&self, path: &str) -> ContentResult<Option<ContentItem>> {
        let path = canonical_path(path)?;
        match self.records.find(&path)? {
            Some(document) => Ok(Some(decode_document(&document)?)),
            None => Ok(None),
        }
    }

    pub fn open(&self, path: &str) -> ContentResult<(ContentReader, ContentItem)> {
        let path = canonical_path(path)?;
        // A concurrent re-store can swap the record and drop the object we just
        // looked up; re-reading the record picks up the replacement.
        let mut attempts = 0;
        loop {
            attempts += 1;
            let Some(record) = self.records.find_with_payload(&path)? else {
                return Err(ContentError::not_found(&path));
            };
            let item = decode_document(&record.document)?;
            match &item.payload {
                Payload::Inline => {
                    let bytes = record.inline.ok_or_else(|| {
                        ContentError::from(StoreError::Corrupt(format!(
                            "inline payload missing for '{}'",
                            path
                        )))
                    })?;
                    return Ok((Box::new(Cursor::new(bytes)), item));
                }
                Payload::External(key) => match self.objects.open(key) {
                    Ok(reader) => return Ok((reader, item)),
                    Err(StoreError::NotFound(_)) if attempts < OPEN_ATTEMPTS => {
                        debug!("Object for '{}' vanished during open; retrying", path);
                        continue;
                    }
                    Err(StoreError::NotFound(_)) => return Err(ContentError::not_found(&path)),
                    Err(err) => return Err(err.into()),
                },
            }
        }
    }

    /// Full payload in memory, regardless of placement.
    pub fn read_all(&self, path: &str) -> ContentResult<(Vec<u8>, ContentItem)> {
        let (mut reader, item) = self.open(path)?;
        let mut bytes = Vec::with_capacity(item.size.min(self.threshold) as usize);
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| ContentError::backend(format!("reading '{}'", item.path), err))?;
        Ok((bytes, item))
    }

    pub fn render(&self, path: &str) -> ContentResult<RenderedContent> {
        let path = canonical_path(path)?;
        let Some(document) = self.records.find(&path)? else {
            return Err(ContentError::not_found(&path));
        };
        if !document.is_markdown {
            return Err(ContentError::not_markdown(&path));
        }
        let (bytes, item) = self.read_all(&path)?;
        if !item.is_markdown {
            return Err(ContentError::not_markdown(&path));
        }
        let rendered = self.renderer.render(&bytes);
        Ok(RenderedContent {
            html: rendered.html,
            title: rendered.title,
            last_modified: item.last_modified,
        })
    }

    /// Remove the item and any external payload. Absent paths are a no-op.
    pub fn delete(&self, path: &str) -> ContentResult<()> {
        let path = canonical_path(path)?;
        let Some(removed) = self.records.remove(&path)? else {
            debug!("Delete of '{}' found nothing to remove", path);
            return Ok(());
        };
        if let Some(key) = removed.object_key() {
            match self.objects.remove(&key) {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(err) => {
                    return Err(ContentError::from(err)
                        .context(format!("releasing object for '{}'", path)));
                }
            }
        }
        info!("Deleted '{}'", path);
        Ok(())
    }

    /// Look up `path`; a miss on `<name>.html` retries `<name>.md` once.
    pub fn resolve(&self, path: &str) -> ContentResult<ContentItem> {
        let path = canonical_path(path)?;
        if let Some(item) = self.get(&path)? {
            return Ok(item);
        }
        if let Some(markdown_path) = markdown_source_for(&path)
            && let Some(item) = self.get(&markdown_path)?
        {
            debug!("Resolved '{}' to markdown source '{}'", path, markdown_path);
            return Ok(item);
        }
        Err(ContentError::not_found(&path))
    }

    pub(crate) fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    fn discard_object(&self, key: &ObjectKey) {
        match self.objects.remove(key) {
            Ok(()) => debug!("Released object {}", key),
            Err(StoreError::NotFound(_)) => {}
            Err(err) => warn!("Failed to release object {}: {}", key, err),
        }
    }
}

/// `docs/page.html` -> `docs/page.md`; `None` for anything not ending in `.html`.
pub fn markdown_source_for(path: &str) -> Option<String> {
    match extension(path) {
        Some(ext) if ext.eq_ignore_ascii_case("html") => {
            Some(format!("{}.md", strip_extension(path)))
        }
        _ => None,
    }
}

/// Validate a logical path and drop leading slashes.
///
/// Paths stay case-sensitive. Empty, `.`/`..` segments, backslashes and
/// control characters are refused.
pub fn canonical_path(raw: &str) -> ContentResult<String> {
    let trimmed = raw.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ContentError::invalid_input("path must not be empty"));
    }
    if trimmed.chars().any(|ch| ch.is_control()) || trimmed.contains('\\') {
        return Err(ContentError::invalid_input(format!(
            "path '{}' contains invalid characters",
            raw.escape_debug()
        )));
    }
    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(ContentError::invalid_input(format!(
            "path '{}' contains empty or dot segments",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn check_length(path: &str, declared: u64, actual: u64) -> ContentResult<()> {
    if actual == declared {
        return Ok(());
    }
    if actual > declared {
        Err(ContentError::invalid_input(format!(
            "payload for '{}' is longer than the declared {} bytes",
            path, declared
        )))
    } else {
        Err(ContentError::invalid_input(format!(
            "payload for '{}' has {} bytes, declared {}",
            path, actual, declared
        )))
    }
}

fn decode_document(document: &RecordDocument) -> ContentResult<ContentItem> {
    decode_item(document)
        .map_err(|err| ContentError::backend(format!("record for '{}'", document.path), err))
}
