//! Persisted State Store
//!
//! Byte-level key/value store behind the queue, identity cache and context
//! cache. Records are grouped into namespaces; each component encodes its own
//! values. The durable implementation is sled, the in-memory one is for tests
//! and for degrading to a no-op when the database cannot be opened.

pub mod memory;
pub mod persistence;

use crate::error::StorageError;

pub use memory::MemoryStateStore;
pub use persistence::SledStateStore;

/// Logical record groups in the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Not-yet-uploaded prompts, keyed by location prefix + big-endian id.
    Queue,
    /// Workspace, peer and session id mappings.
    Identity,
    /// Last fetched context snapshot per location.
    Context,
    /// Refresh counters per location.
    Policy,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Queue => "queue",
            Namespace::Identity => "identity",
            Namespace::Context => "context",
            Namespace::Policy => "policy",
        }
    }

    pub fn all() -> [Namespace; 4] {
        [
            Namespace::Queue,
            Namespace::Identity,
            Namespace::Context,
            Namespace::Policy,
        ]
    }
}

/// Read-modify-write closure: receives the current value, returns the new one
/// (`None` deletes the key).
pub type UpdateFn<'a> = &'a mut dyn FnMut(Option<&[u8]>) -> Option<Vec<u8>>;

/// Persisted state store interface.
///
/// `update` must be atomic with respect to other callers of the same store so
/// concurrent counter increments and queue appends are never lost.
pub trait StateStore: Send + Sync {
    fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    fn remove(&self, ns: Namespace, key: &[u8]) -> Result<(), StorageError>;

    /// All records whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(
        &self,
        ns: Namespace,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Atomically replace the value at `key`, returning the stored result.
    fn update(
        &self,
        ns: Namespace,
        key: &[u8],
        f: UpdateFn<'_>,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    /// Monotonically increasing id, unique for the lifetime of the store.
    fn next_id(&self) -> Result<u64, StorageError>;

    /// Make previous writes durable.
    fn flush(&self) -> Result<(), StorageError>;
}
