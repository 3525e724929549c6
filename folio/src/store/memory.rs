// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{ObjectKey, ObjectReader, ObjectStore, RecordDocument, RecordStore, StoreError, StoredRecord};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct MemoryRecord {
    document: RecordDocument,
    inline: Option<Arc<Vec<u8>>>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, MemoryRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, MemoryRecord>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("MemoryRecordStore lock poisoned on read; recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, MemoryRecord>> {
        match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("MemoryRecordStore lock poisoned on write; recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn upsert(&self, record: StoredRecord) -> Result<Option<RecordDocument>, StoreError> {
        let key = record.document.path.clone();
        let entry = MemoryRecord {
            document: record.document,
            inline: record.inline.map(Arc::new),
        };
        Ok(self.write().insert(key, entry).map(|old| old.document))
    }

    fn find(&self, path: &str) -> Result<Option<RecordDocument>, StoreError> {
        Ok(self.read().get(path).map(|record| record.document.clone()))
    }

    fn find_with_payload(&self, path: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.read().get(path).map(|record| StoredRecord {
            document: record.document.clone(),
            inline: record.inline.as_ref().map(|bytes| bytes.as_ref().clone()),
        }))
    }

    fn find_all(&self) -> Result<Vec<RecordDocument>, StoreError> {
        Ok(self
            .read()
            .values()
            .map(|record| record.document.clone())
            .collect())
    }

    fn remove(&self, path: &str) -> Result<Option<RecordDocument>, StoreError> {
        Ok(self.write().remove(path).map(|old| old.document))
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, Arc<Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects
            .read()
            .map(|guard| guard.contains_key(key))
            .unwrap_or(false)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &ObjectKey, reader: &mut dyn Read) -> Result<u64, StoreError> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let written = buffer.len() as u64;
        let mut guard = match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(key.clone(), Arc::new(buffer));
        Ok(written)
    }

    fn open(&self, key: &ObjectKey) -> Result<ObjectReader, StoreError> {
        let guard = match self.objects.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bytes = guard
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(Box::new(Cursor::new(SharedBytes(bytes))))
    }

    fn remove(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut guard = match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

/// Lets a reader borrow an object's bytes without copying them out of the map.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}
