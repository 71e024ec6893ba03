//! Core types shared across the hook.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Id assigned to a queued message; monotonic within one state store.
pub type QueuedMessageId = u64;

/// Name of a peer in the remote memory service.
pub type PeerName = String;

/// Absolute working directory used to scope per-project state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey(PathBuf);

impl LocationKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocationKey(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Key prefix for records scoped to this location.
    ///
    /// Terminated with a NUL byte so `/a/b` never prefixes `/a/bc`.
    pub fn scope_prefix(&self) -> Vec<u8> {
        let mut prefix = self.0.to_string_lossy().into_owned().into_bytes();
        prefix.push(0);
        prefix
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
