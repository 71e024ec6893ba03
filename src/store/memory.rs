//! In-memory state store.

use super::{Namespace, StateStore, UpdateFn};
use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Volatile store with the same semantics as the sled one.
///
/// Used by tests and as the fallback when the database cannot be opened, in
/// which case nothing survives the process.
#[derive(Default)]
pub struct MemoryStateStore {
    tables: Mutex<HashMap<Namespace, Table>>,
    ids: AtomicU64,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace.
    pub fn len(&self, ns: Namespace) -> usize {
        self.tables.lock().get(&ns).map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().values().all(|t| t.is_empty())
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tables.lock().get(&ns).and_then(|t| t.get(key).cloned()))
    }

    fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.tables
            .lock()
            .entry(ns)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, ns: Namespace, key: &[u8]) -> Result<(), StorageError> {
        if let Some(table) = self.tables.lock().get_mut(&ns) {
            table.remove(key);
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        ns: Namespace,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let tables = self.tables.lock();
        let Some(table) = tables.get(&ns) else {
            return Ok(Vec::new());
        };
        Ok(table
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn update(
        &self,
        ns: Namespace,
        key: &[u8],
        f: UpdateFn<'_>,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let mut tables = self.tables.lock();
        let table = tables.entry(ns).or_default();
        let next = f(table.get(key).map(|v| v.as_slice()));
        match &next {
            Some(value) => {
                table.insert(key.to_vec(), value.clone());
            }
            None => {
                table.remove(key);
            }
        }
        Ok(next)
    }

    fn next_id(&self) -> Result<u64, StorageError> {
        Ok(self.ids.fetch_add(1, Ordering::SeqCst))
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
