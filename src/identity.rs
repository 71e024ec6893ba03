//! Identity Cache
//!
//! Remembers the remote ids behind workspace names, peer names and local
//! session paths so the hot path can skip get-or-create round trips. Entries
//! never expire; a later `set` for the same key overwrites. A miss (including
//! an unreadable record) only means the caller takes the remote path.

use crate::error::{RecallError, StorageError};
use crate::store::{Namespace, StateStore};
use crate::types::LocationKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentityKind {
    Workspace,
    Peer,
    Session,
}

impl IdentityKind {
    fn tag(&self) -> &'static str {
        match self {
            IdentityKind::Workspace => "workspace",
            IdentityKind::Peer => "peer",
            IdentityKind::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedId {
    id: String,
}

/// Session id cached for a directory, with the session name it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub name: String,
    pub id: String,
}

pub struct IdentityCache {
    store: Arc<dyn StateStore>,
}

impl IdentityCache {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    fn key(kind: IdentityKind, name: &str) -> Vec<u8> {
        let mut key = kind.tag().as_bytes().to_vec();
        key.push(0);
        key.extend_from_slice(name.as_bytes());
        key
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, kind: IdentityKind, name: &str) -> Option<T> {
        let raw = match self.store.get(Namespace::Identity, &Self::key(kind, name)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(kind = kind.tag(), entry = name, error = %e, "Identity cache read failed");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(kind = kind.tag(), entry = name, error = %e, "Ignoring corrupt identity record");
                None
            }
        }
    }

    fn write<T: Serialize>(
        &self,
        kind: IdentityKind,
        name: &str,
        value: &T,
    ) -> Result<(), RecallError> {
        let encoded =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store
            .put(Namespace::Identity, &Self::key(kind, name), &encoded)?;
        Ok(())
    }

    pub fn workspace_id(&self, name: &str) -> Option<String> {
        self.read::<CachedId>(IdentityKind::Workspace, name)
            .map(|c| c.id)
    }

    pub fn set_workspace_id(&self, name: &str, id: &str) -> Result<(), RecallError> {
        self.write(IdentityKind::Workspace, name, &CachedId { id: id.to_string() })
    }

    pub fn peer_id(&self, name: &str) -> Option<String> {
        self.read::<CachedId>(IdentityKind::Peer, name).map(|c| c.id)
    }

    /// Peers are provisioned by configuration; this only records the mapping.
    pub fn set_peer_id(&self, name: &str, id: &str) -> Result<(), RecallError> {
        self.write(IdentityKind::Peer, name, &CachedId { id: id.to_string() })
    }

    pub fn session(&self, location: &LocationKey) -> Option<CachedSession> {
        self.read(IdentityKind::Session, &location.to_string())
    }

    pub fn session_id(&self, location: &LocationKey) -> Option<String> {
        self.session(location).map(|s| s.id)
    }

    /// Session id for `location`, only if it was resolved for `session_name`.
    ///
    /// A changed session mapping for the directory therefore reads as a miss.
    pub fn session_id_for(&self, location: &LocationKey, session_name: &str) -> Option<String> {
        self.session(location)
            .filter(|s| s.name == session_name)
            .map(|s| s.id)
    }

    pub fn set_session_id(
        &self,
        location: &LocationKey,
        session_name: &str,
        id: &str,
    ) -> Result<(), RecallError> {
        self.write(
            IdentityKind::Session,
            &location.to_string(),
            &CachedSession {
                name: session_name.to_string(),
                id: id.to_string(),
            },
        )
    }
}
