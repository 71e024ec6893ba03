//! Sled-backed state store.

use super::{Namespace, StateStore, UpdateFn};
use crate::error::StorageError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts made while another hook invocation holds the database lock.
const OPEN_ATTEMPTS: u32 = 8;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(25);

pub struct SledStateStore {
    db: sled::Db,
    queue: sled::Tree,
    identity: sled::Tree,
    context: sled::Tree,
    policy: sled::Tree,
}

impl SledStateStore {
    /// Open (or create) the state database at `path`.
    ///
    /// sled holds an exclusive file lock for the lifetime of the handle, so a
    /// concurrent invocation briefly waits for the other process to exit.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;

        let mut attempt = 0;
        let db = loop {
            attempt += 1;
            match sled::Config::new().path(path).open() {
                Ok(db) => break db,
                Err(e) if attempt < OPEN_ATTEMPTS => {
                    debug!(attempt, error = %e, "State database busy, retrying open");
                    std::thread::sleep(OPEN_RETRY_DELAY);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to open state database");
                    return Err(e.into());
                }
            }
        };

        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            queue: db.open_tree(Namespace::Queue.as_str())?,
            identity: db.open_tree(Namespace::Identity.as_str())?,
            context: db.open_tree(Namespace::Context.as_str())?,
            policy: db.open_tree(Namespace::Policy.as_str())?,
            db,
        })
    }

    fn tree(&self, ns: Namespace) -> &sled::Tree {
        match ns {
            Namespace::Queue => &self.queue,
            Namespace::Identity => &self.identity,
            Namespace::Context => &self.context,
            Namespace::Policy => &self.policy,
        }
    }
}

impl StateStore for SledStateStore {
    fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree(ns).get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.tree(ns).insert(key, value)?;
        Ok(())
    }

    fn remove(&self, ns: Namespace, key: &[u8]) -> Result<(), StorageError> {
        self.tree(ns).remove(key)?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        ns: Namespace,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut out = Vec::new();
        for item in self.tree(ns).scan_prefix(prefix) {
            let (k, v) = item?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    fn update(
        &self,
        ns: Namespace,
        key: &[u8],
        f: UpdateFn<'_>,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let updated = self.tree(ns).update_and_fetch(key, |old| f(old))?;
        Ok(updated.map(|v| v.to_vec()))
    }

    fn next_id(&self) -> Result<u64, StorageError> {
        Ok(self.db.generate_id()?)
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
