// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use folio::config::ExportConfig;
use folio::content::{ContentResult, EntryMetadata, PlacementEngine};
use folio::service::{ContentService, Dispatched};
use folio::store::{FsRoot, MemoryObjectStore, MemoryRecordStore, ObjectStore, RecordStore};
use folio::util::test_fixtures::TestFixtureRoot;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::FileOptions;

pub struct Harness {
    pub fixture: TestFixtureRoot,
    pub service: ContentService,
    pub records: Arc<MemoryRecordStore>,
    pub objects: Arc<MemoryObjectStore>,
}

impl Harness {
    pub fn new(name: &str, threshold: u64) -> Self {
        let records = Arc::new(MemoryRecordStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let fixture = TestFixtureRoot::new_unique(name).expect("fixture root");
        let service = service_over(
            &fixture,
            records.clone(),
            objects.clone(),
            threshold,
        );
        Self {
            fixture,
            service,
            records,
            objects,
        }
    }

    pub fn put(&self, path: &str, bytes: &[u8]) -> ContentResult<Dispatched> {
        put(&self.service, path, bytes, None)
    }

    pub fn put_at(&self, path: &str, bytes: &[u8], when: DateTime<Utc>) -> ContentResult<Dispatched> {
        put(&self.service, path, bytes, Some(when))
    }
}

pub fn service_over(
    fixture: &TestFixtureRoot,
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    threshold: u64,
) -> ContentService {
    ContentService::new(
        PlacementEngine::new(records, objects, threshold),
        FsRoot::new(fixture.path().join("static")),
        FsRoot::new(fixture.path().join("templates")),
        &ExportConfig::default(),
    )
}

pub fn put(
    service: &ContentService,
    path: &str,
    bytes: &[u8],
    when: Option<DateTime<Utc>>,
) -> ContentResult<Dispatched> {
    service.upload(
        EntryMetadata::new(path, bytes.len() as u64, when),
        &mut Cursor::new(bytes.to_vec()),
    )
}

/// Zip timestamps have two-second resolution; keep test times on even seconds.
pub fn even_time(day: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 30, second - second % 2)
        .single()
        .expect("valid timestamp")
}

pub fn zip_bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, FileOptions::default())
                .expect("add directory");
            continue;
        }
        writer
            .start_file(*name, FileOptions::default())
            .expect("start entry");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish bundle").into_inner()
}

pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("open bundle");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

pub fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("open bundle");
    let mut file = archive.by_name(name).expect("entry present");
    let mut out = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut out).expect("read entry");
    out
}
