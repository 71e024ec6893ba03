//! Durable Message Queue
//!
//! Write-ahead log of prompts that have not been confirmed by the remote
//! memory service. `enqueue` runs before any network I/O and never fails the
//! caller; `drain` uploads pending entries oldest first and only forgets an
//! entry after its own upload succeeded.
//!
//! When the state database is held by another invocation the queue sits on
//! volatile memory; a [`Spool`] then keeps a file per prompt until it is
//! confirmed or absorbed by the next invocation that owns the database.

pub mod spool;

pub use spool::Spool;

use crate::error::RecallError;
use crate::store::{Namespace, StateStore};
use crate::types::{LocationKey, PeerName, QueuedMessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A prompt waiting to be mirrored to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: QueuedMessageId,
    pub content: String,
    pub author: PeerName,
    pub location_key: LocationKey,
    pub enqueued_at: DateTime<Utc>,
    pub uploaded: bool,
    /// Assistant session that produced the prompt, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Entries still waiting after the pass.
    pub remaining: usize,
}

pub struct DurableQueue {
    store: Arc<dyn StateStore>,
    spool: Option<Arc<Spool>>,
}

impl DurableQueue {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store, spool: None }
    }

    /// Queue over a volatile store, mirrored into `spool`.
    pub fn with_spool(store: Arc<dyn StateStore>, spool: Arc<Spool>) -> Self {
        Self {
            store,
            spool: Some(spool),
        }
    }

    fn entry_key(location: &LocationKey, id: QueuedMessageId) -> Vec<u8> {
        let mut key = location.scope_prefix();
        key.extend_from_slice(&id.to_be_bytes());
        key
    }

    /// Append a prompt and make it durable.
    ///
    /// Returns `None` when the store rejected the write; the failure is logged
    /// and the caller carries on.
    pub fn enqueue(
        &self,
        content: &str,
        author: &str,
        location: &LocationKey,
        instance_id: Option<&str>,
    ) -> Option<QueuedMessageId> {
        let start = Instant::now();
        match self.try_enqueue(content, author, location, instance_id) {
            Ok(id) => {
                debug!(
                    id,
                    location = %location,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Queued prompt"
                );
                Some(id)
            }
            Err(e) => {
                warn!(location = %location, error = %e, "Failed to queue prompt, continuing without durability");
                None
            }
        }
    }

    fn try_enqueue(
        &self,
        content: &str,
        author: &str,
        location: &LocationKey,
        instance_id: Option<&str>,
    ) -> Result<QueuedMessageId, RecallError> {
        let message = self.append(QueuedMessage {
            id: 0,
            content: content.to_string(),
            author: author.to_string(),
            location_key: location.clone(),
            enqueued_at: Utc::now(),
            uploaded: false,
            instance_id: instance_id.map(str::to_string),
        })?;

        if let Some(spool) = &self.spool {
            if let Err(e) = spool.write(&message) {
                warn!(id = message.id, error = %e, "Failed to spool prompt, it only lives in memory");
            }
        }
        Ok(message.id)
    }

    /// Store `message` under a fresh id and flush.
    fn append(&self, mut message: QueuedMessage) -> Result<QueuedMessage, RecallError> {
        message.id = self.store.next_id()?;
        let encoded = serde_json::to_vec(&message)
            .map_err(|e| crate::error::StorageError::Serialization(e.to_string()))?;
        self.store.put(
            Namespace::Queue,
            &Self::entry_key(&message.location_key, message.id),
            &encoded,
        )?;
        self.store.flush()?;
        Ok(message)
    }

    /// Move every spooled prompt into this queue, any location.
    ///
    /// Each file is deleted only after its entry was flushed, so a crash in
    /// between uploads the prompt twice rather than losing it.
    pub fn absorb_spool(&self, spool: &Spool) -> Result<usize, RecallError> {
        let mut absorbed = 0;
        for (path, message) in spool.entries()? {
            let message = self.append(QueuedMessage {
                uploaded: false,
                ..message
            })?;
            spool.discard(&path)?;
            debug!(id = message.id, location = %message.location_key, "Absorbed spooled prompt");
            absorbed += 1;
        }
        if absorbed > 0 {
            info!(absorbed, "Spooled prompts moved into the queue");
        }
        Ok(absorbed)
    }

    /// Entries for `location` oldest first, uploaded ones included.
    ///
    /// Undecodable records are skipped with a warning and left in place.
    pub fn entries(&self, location: &LocationKey) -> Result<Vec<QueuedMessage>, RecallError> {
        let rows = self
            .store
            .scan_prefix(Namespace::Queue, &location.scope_prefix())?;
        let mut messages = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            match serde_json::from_slice::<QueuedMessage>(&value) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(
                        location = %location,
                        key_len = key.len(),
                        error = %e,
                        "Skipping corrupt queue record"
                    );
                }
            }
        }
        Ok(messages)
    }

    /// Entries for `location` still waiting for upload.
    pub fn pending(&self, location: &LocationKey) -> Result<Vec<QueuedMessage>, RecallError> {
        Ok(self
            .entries(location)?
            .into_iter()
            .filter(|m| !m.uploaded)
            .collect())
    }

    /// Record a confirmed upload. The entry is removed by the next `compact`.
    pub fn mark_uploaded(
        &self,
        location: &LocationKey,
        id: QueuedMessageId,
    ) -> Result<(), RecallError> {
        let key = Self::entry_key(location, id);
        self.store.update(Namespace::Queue, &key, &mut |old| {
            let old = old?;
            match serde_json::from_slice::<QueuedMessage>(old) {
                Ok(mut message) => {
                    message.uploaded = true;
                    serde_json::to_vec(&message).ok().or_else(|| Some(old.to_vec()))
                }
                Err(_) => Some(old.to_vec()),
            }
        })?;
        Ok(())
    }

    /// Delete entries whose upload has been confirmed.
    pub fn compact(&self, location: &LocationKey) -> Result<usize, RecallError> {
        let mut removed = 0;
        for message in self.entries(location)? {
            if message.uploaded {
                self.store
                    .remove(Namespace::Queue, &Self::entry_key(location, message.id))?;
                removed += 1;
            }
        }
        if removed > 0 {
            self.store.flush()?;
        }
        Ok(removed)
    }

    /// Upload every pending entry for `location`, oldest first.
    ///
    /// A rejected entry stays queued and the pass moves on. An unreachable
    /// service ends the pass early: the rest would fail the same way, one
    /// request timeout each.
    pub async fn drain<F, Fut>(
        &self,
        location: &LocationKey,
        mut upload: F,
    ) -> Result<DrainReport, RecallError>
    where
        F: FnMut(QueuedMessage) -> Fut,
        Fut: Future<Output = Result<(), RecallError>>,
    {
        // Leftovers from a pass interrupted between confirm and delete.
        self.compact(location)?;

        let pending = self.pending(location)?;
        let mut report = DrainReport::default();

        for message in pending {
            let id = message.id;
            let spooled = self.spool.as_ref().map(|_| message.clone());
            report.attempted += 1;
            match upload(message).await {
                Ok(()) => match self.mark_uploaded(location, id) {
                    Ok(()) => {
                        report.uploaded += 1;
                        if let (Some(spool), Some(message)) = (&self.spool, &spooled) {
                            if let Err(e) = spool.release(message) {
                                warn!(id, error = %e, "Uploaded prompt left in spool, it may be sent again");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(id, error = %e, "Uploaded message could not be marked, it may be sent again");
                        report.failed += 1;
                    }
                },
                Err(e) if e.is_unavailable() => {
                    warn!(id, error = %e, "Memory service unavailable, ending upload pass");
                    report.failed += 1;
                    break;
                }
                Err(e) => {
                    warn!(
                        id,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Message upload failed, keeping it queued"
                    );
                    report.failed += 1;
                }
            }
        }

        self.compact(location)?;
        report.remaining = self.pending(location)?.len();

        info!(
            location = %location,
            attempted = report.attempted,
            uploaded = report.uploaded,
            remaining = report.remaining,
            "Queue drain finished"
        );
        Ok(report)
    }
}
