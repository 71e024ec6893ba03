//! Context Cache
//!
//! Per-directory snapshot plus the rolling prompt counter that drives the
//! threshold refresh. Both survive process restarts; corrupt records read as
//! absent.

use super::ContextSnapshot;
use crate::error::{RecallError, StorageError};
use crate::store::{Namespace, StateStore};
use crate::types::LocationKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_STALENESS: Duration = Duration::from_secs(60);
pub const DEFAULT_REFRESH_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Maximum snapshot age before it must be refetched.
    pub staleness: Duration,
    /// Prompts after which a refresh is forced; 0 disables the trigger.
    pub threshold: u32,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            threshold: DEFAULT_REFRESH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicyState {
    pub messages_since_last_refresh: u32,
    #[serde(default)]
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

pub struct ContextCache {
    store: Arc<dyn StateStore>,
    location: LocationKey,
    settings: RefreshSettings,
}

impl ContextCache {
    pub fn new(store: Arc<dyn StateStore>, location: LocationKey, settings: RefreshSettings) -> Self {
        Self {
            store,
            location,
            settings,
        }
    }

    pub fn settings(&self) -> RefreshSettings {
        self.settings
    }

    fn key(&self) -> Vec<u8> {
        self.location.scope_prefix()
    }

    pub fn snapshot(&self) -> Option<ContextSnapshot> {
        let raw = match self.store.get(Namespace::Context, &self.key()) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(location = %self.location, error = %e, "Context cache read failed");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(location = %self.location, error = %e, "Ignoring corrupt context snapshot");
                None
            }
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Replace the stored snapshot.
    pub fn set_snapshot(&self, snapshot: &ContextSnapshot) -> Result<(), RecallError> {
        let encoded =
            serde_json::to_vec(snapshot).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(Namespace::Context, &self.key(), &encoded)?;
        Ok(())
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// True when there is no snapshot or it is older than the staleness window.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match self.snapshot() {
            Some(snapshot) => self.snapshot_is_stale(&snapshot, now),
            None => true,
        }
    }

    pub fn snapshot_is_stale(&self, snapshot: &ContextSnapshot, now: DateTime<Utc>) -> bool {
        let window = chrono::Duration::milliseconds(self.settings.staleness.as_millis() as i64);
        now.signed_duration_since(snapshot.fetched_at) > window
    }

    pub fn policy_state(&self) -> RefreshPolicyState {
        match self.store.get(Namespace::Policy, &self.key()) {
            Ok(Some(raw)) => decode_policy(Some(raw.as_slice())),
            Ok(None) => RefreshPolicyState::default(),
            Err(e) => {
                warn!(location = %self.location, error = %e, "Refresh policy read failed");
                RefreshPolicyState::default()
            }
        }
    }

    pub fn message_count(&self) -> u32 {
        self.policy_state().messages_since_last_refresh
    }

    /// Count one processed prompt and return the new total.
    pub fn increment_message_count(&self) -> Result<u32, RecallError> {
        let stored = self.store.update(Namespace::Policy, &self.key(), &mut |old| {
            let mut state = decode_policy(old);
            state.messages_since_last_refresh = state.messages_since_last_refresh.saturating_add(1);
            serde_json::to_vec(&state).ok()
        })?;
        Ok(decode_policy(stored.as_deref()).messages_since_last_refresh)
    }

    pub fn should_force_refresh(&self) -> bool {
        self.threshold_reached(self.message_count())
    }

    pub fn threshold_reached(&self, count: u32) -> bool {
        self.settings.threshold > 0 && count >= self.settings.threshold
    }

    /// Reset the counter and record the refresh time.
    pub fn acknowledge_refresh(&self) -> Result<(), RecallError> {
        self.acknowledge_refresh_at(Utc::now())
    }

    pub fn acknowledge_refresh_at(&self, now: DateTime<Utc>) -> Result<(), RecallError> {
        let state = RefreshPolicyState {
            messages_since_last_refresh: 0,
            last_refreshed_at: Some(now),
        };
        let encoded =
            serde_json::to_vec(&state).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(Namespace::Policy, &self.key(), &encoded)?;
        Ok(())
    }
}

fn decode_policy(raw: Option<&[u8]>) -> RefreshPolicyState {
    raw.and_then(|bytes| serde_json::from_slice(bytes).ok())
        .unwrap_or_default()
}
