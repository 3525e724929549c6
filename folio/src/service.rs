// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Front door for callers: single-file upload, bundle import/export and reads.

use crate::archive::{
    self, BundleLayout, EntrySink, ExportReport, ExportSources, ImportReport,
};
use crate::config::{ExportConfig, StorageBackend, ValidatedConfig};
use crate::content::{
    Category, ContentError, ContentItem, ContentReader, ContentResult, ContentSummary,
    EntryMetadata, ExactReader, NewContent, PlacementEngine, SniffedReader, canonical_path,
    classify,
};
use crate::runtime_paths::RuntimePaths;
use crate::store::{
    FileObjectStore, FileRecordStore, FsEntry, FsRoot, MemoryObjectStore, MemoryRecordStore,
    ObjectStore, RecordStore, StoreError,
};
use crate::templates::{MiniJinjaEngine, TemplateEngine};
use crate::util::{MARKDOWN_MIME, detect_mime_type, guess_mime_type};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

/// Where an incoming file came from. Only changes how `.zip` files are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Uploaded directly; a `.zip` is unpacked as a bundle.
    Upload,
    /// Found inside a bundle; a nested `.zip` is kept as an opaque asset.
    Archive,
}

#[derive(Debug)]
pub enum Dispatched {
    Stored(ContentItem),
    Written {
        category: Category,
        path: String,
        size: u64,
    },
    Imported(ImportReport),
}

impl Dispatched {
    pub fn category(&self) -> Category {
        match self {
            Dispatched::Stored(item) if item.is_markdown => Category::Markdown,
            Dispatched::Stored(item) => match classify(&item.path) {
                Category::Archive => Category::Archive,
                _ => Category::Asset,
            },
            Dispatched::Written { category, .. } => *category,
            Dispatched::Imported(_) => Category::Archive,
        }
    }
}

/// Result of a read through [`ContentService::serve`].
pub enum Served {
    /// Markdown rendered to a sanitized HTML fragment.
    Page {
        path: String,
        html: String,
        title: Option<String>,
        last_modified: DateTime<Utc>,
    },
    /// Raw bytes, streamed.
    File {
        path: String,
        reader: ContentReader,
        size: u64,
        mime_type: String,
        last_modified: DateTime<Utc>,
    },
}

pub struct ContentService {
    engine: PlacementEngine,
    static_root: FsRoot,
    template_root: FsRoot,
    layout: BundleLayout,
    templates: Box<dyn TemplateEngine>,
    site_title: String,
}

impl ContentService {
    pub fn new(
        engine: PlacementEngine,
        static_root: FsRoot,
        template_root: FsRoot,
        export: &ExportConfig,
    ) -> Self {
        Self {
            engine,
            static_root,
            template_root,
            layout: BundleLayout::from_config(export),
            templates: Box::new(MiniJinjaEngine::new()),
            site_title: export.site_title.clone(),
        }
    }

    /// Wire stores for the configured backend under the runtime layout.
    pub fn from_config(paths: &RuntimePaths, config: &ValidatedConfig) -> Self {
        let (records, objects): (Arc<dyn RecordStore>, Arc<dyn ObjectStore>) =
            match config.storage.backend {
                StorageBackend::Filesystem => (
                    Arc::new(FileRecordStore::new(&paths.records_dir)),
                    Arc::new(FileObjectStore::new(&paths.objects_dir)),
                ),
                StorageBackend::Memory => (
                    Arc::new(MemoryRecordStore::new()),
                    Arc::new(MemoryObjectStore::new()),
                ),
            };
        info!(
            "Content storage: {:?} backend, inline threshold {} bytes",
            config.storage.backend, config.storage.inline_threshold_bytes
        );
        let engine = PlacementEngine::new(records, objects, config.storage.inline_threshold_bytes);
        Self::new(
            engine,
            FsRoot::new(&paths.static_dir),
            FsRoot::new(&paths.templates_dir),
            &config.export,
        )
    }

    pub fn with_templates(mut self, templates: Box<dyn TemplateEngine>) -> Self {
        self.templates = templates;
        self
    }

    pub fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    pub fn static_root(&self) -> &FsRoot {
        &self.static_root
    }

    /// Single-file upload.
    pub fn upload(&self, meta: EntryMetadata, reader: &mut dyn Read) -> ContentResult<Dispatched> {
        self.dispatch(meta, reader, EntrySource::Upload)
    }

    /// The one routing point for incoming files, shared by direct uploads and
    /// bundle entries: classify by name, then store, write or unpack.
    pub fn dispatch(
        &self,
        meta: EntryMetadata,
        reader: &mut dyn Read,
        source: EntrySource,
    ) -> ContentResult<Dispatched> {
        let path = canonical_path(&meta.path)?;
        let category = classify(&path);
        debug!("Dispatching '{}' as {} ({:?})", path, category, source);

        match (category, source) {
            (Category::Markdown, _) => {
                let content = NewContent {
                    path,
                    size: meta.size,
                    last_modified: meta.modified_or_now(),
                    mime_type: MARKDOWN_MIME.to_string(),
                    is_markdown: true,
                };
                Ok(Dispatched::Stored(self.engine.store(content, reader)?))
            }
            (Category::Asset, _) => self.store_asset(path, &meta, reader),
            (Category::Archive, EntrySource::Archive) => {
                info!("Nested bundle '{}' kept as an asset", path);
                self.store_asset(path, &meta, reader)
            }
            (Category::Archive, EntrySource::Upload) => {
                let report = self.import_archive(&path, reader, meta.size)?;
                Ok(Dispatched::Imported(report))
            }
            (Category::Static, _) => {
                self.write_file(&self.static_root, Category::Static, path, &meta, reader)
            }
            (Category::Template, _) => {
                self.write_file(&self.template_root, Category::Template, path, &meta, reader)
            }
        }
    }

    fn store_asset(
        &self,
        path: String,
        meta: &EntryMetadata,
        reader: &mut dyn Read,
    ) -> ContentResult<Dispatched> {
        let mut sniffed = SniffedReader::new(reader)?;
        let mime_type = detect_mime_type(&path, sniffed.prefix());
        let content = NewContent {
            path,
            size: meta.size,
            last_modified: meta.modified_or_now(),
            mime_type,
            is_markdown: false,
        };
        Ok(Dispatched::Stored(self.engine.store(content, &mut sniffed)?))
    }

    fn write_file(
        &self,
        root: &FsRoot,
        category: Category,
        path: String,
        meta: &EntryMetadata,
        reader: &mut dyn Read,
    ) -> ContentResult<Dispatched> {
        if meta.size == 0 {
            return Err(ContentError::invalid_input(format!(
                "size must be greater than zero for '{}'",
                path
            )));
        }
        let mut exact = ExactReader::new(reader, meta.size);
        match root.write(&path, &mut exact, meta.modified) {
            Ok(size) => {
                info!("Wrote {} '{}' ({} bytes)", category, path, size);
                Ok(Dispatched::Written {
                    category,
                    path,
                    size,
                })
            }
            Err(err) => match exact.mismatch() {
                Some(actual) => Err(ContentError::invalid_input(format!(
                    "payload for '{}' has {} bytes or more, declared {}",
                    path, actual, meta.size
                ))),
                None => Err(ContentError::from(err).context(format!("writing '{}'", path))),
            },
        }
    }

    /// Read path for front ends: static files are served as-is, markdown is
    /// rendered, everything else is streamed. A miss on `<name>.html` falls
    /// back to `<name>.md` once.
    pub fn serve(&self, path: &str) -> ContentResult<Served> {
        let path = canonical_path(path)?;
        if classify(&path) == Category::Static {
            match self.static_root.open(&path) {
                Ok((file, entry)) => {
                    return Ok(Served::File {
                        mime_type: guess_mime_type(&path),
                        path,
                        reader: Box::new(BufReader::new(file)),
                        size: entry.size,
                        last_modified: entry.modified,
                    });
                }
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let item = self.engine.resolve(&path)?;
        if item.is_markdown {
            let rendered = self.engine.render(&item.path)?;
            return Ok(Served::Page {
                path: item.path,
                html: rendered.html,
                title: rendered.title,
                last_modified: rendered.last_modified,
            });
        }

        let (reader, item) = self.engine.open(&item.path)?;
        Ok(Served::File {
            path: item.path,
            reader,
            size: item.size,
            mime_type: item.mime_type,
            last_modified: item.last_modified,
        })
    }

    /// Delete whatever lives at `path`; absent paths are a no-op.
    pub fn remove(&self, path: &str) -> ContentResult<()> {
        let path = canonical_path(path)?;
        let root = match classify(&path) {
            Category::Static => &self.static_root,
            Category::Template => &self.template_root,
            _ => return self.engine.delete(&path),
        };
        match root.remove(&path) {
            Ok(()) => {
                info!("Deleted '{}'", path);
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list_all(&self) -> ContentResult<Vec<ContentSummary>> {
        self.engine.list_all()
    }

    pub fn static_files(&self) -> ContentResult<Vec<FsEntry>> {
        Ok(self.static_root.list()?)
    }

    pub fn template_files(&self) -> ContentResult<Vec<FsEntry>> {
        Ok(self.template_root.list()?)
    }

    /// Import a bundle from a stream of exactly `size` bytes.
    ///
    /// Zip needs random access, so the stream is spooled to an anonymous
    /// temp file first.
    pub fn import_archive(
        &self,
        archive_name: &str,
        reader: &mut dyn Read,
        size: u64,
    ) -> ContentResult<ImportReport> {
        if size == 0 {
            return Err(ContentError::invalid_input(format!(
                "bundle '{}' is empty",
                archive_name
            )));
        }
        let mut spool = tempfile::tempfile()?;
        let copied = io::copy(&mut reader.take(size + 1), &mut spool)?;
        if copied != size {
            return Err(ContentError::invalid_input(format!(
                "bundle '{}' has {} bytes or more, declared {}",
                archive_name, copied, size
            )));
        }
        spool.seek(SeekFrom::Start(0))?;
        archive::import_archive(spool, archive_name, &self.layout, self)
    }

    pub fn import_archive_file(&self, path: &Path) -> ContentResult<ImportReport> {
        let file = File::open(path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ContentError::not_found(&path.display().to_string())
            } else {
                ContentError::backend(format!("opening '{}'", path.display()), err)
            }
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        archive::import_archive(BufReader::new(file), &name, &self.layout, self)
    }

    pub fn export_archive<W: Write + Seek>(&self, writer: W) -> ContentResult<(W, ExportReport)> {
        let sources = ExportSources {
            engine: &self.engine,
            static_root: &self.static_root,
            template_root: &self.template_root,
        };
        archive::export_archive(
            writer,
            &sources,
            &self.layout,
            self.templates.as_ref(),
            &self.site_title,
        )
    }
}

impl EntrySink for ContentService {
    fn accept(&self, meta: EntryMetadata, reader: &mut dyn Read) -> ContentResult<Category> {
        self.dispatch(meta, reader, EntrySource::Archive)
            .map(|dispatched| dispatched.category())
    }
}
