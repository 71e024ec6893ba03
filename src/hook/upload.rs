//! Background upload of queued prompts.

use super::resolver::IdentityResolver;
use crate::error::RecallError;
use crate::queue::{DrainReport, DurableQueue, QueuedMessage};
use crate::remote::{MemoryApi, NewMessage};
use crate::types::LocationKey;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the upload task needs, owned so it can run on its own task.
pub struct UploadTask {
    pub(crate) queue: Arc<DurableQueue>,
    pub(crate) resolver: IdentityResolver,
    pub(crate) api: Arc<dyn MemoryApi>,
    pub(crate) location: LocationKey,
}

impl UploadTask {
    /// Resolve workspace and session, then drain the directory's queue.
    pub async fn run(self) -> Result<DrainReport, RecallError> {
        let workspace_id = self.resolver.workspace_id().await?;
        let session_id = self.resolver.session_id(&workspace_id, &self.location).await?;

        let api = &self.api;
        let workspace_id = workspace_id.as_str();
        let session_id = session_id.as_str();
        self.queue
            .drain(&self.location, |message| async move {
                let created = api
                    .create_messages(workspace_id, session_id, vec![new_message(&message)])
                    .await?;
                debug!(id = message.id, created = created.len(), "Uploaded queued prompt");
                Ok(())
            })
            .await
    }

    /// `run`, with failures logged rather than returned.
    pub async fn run_logged(self) -> Option<DrainReport> {
        let location = self.location.clone();
        match self.run().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(
                    location = %location,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Upload skipped, prompts stay queued for the next invocation"
                );
                None
            }
        }
    }
}

/// Ingestion payload for a queued prompt.
pub fn new_message(message: &QueuedMessage) -> NewMessage {
    let mut metadata = Map::new();
    metadata.insert(
        "cwd".to_string(),
        Value::String(message.location_key.to_string()),
    );
    metadata.insert(
        "enqueued_at".to_string(),
        Value::String(message.enqueued_at.to_rfc3339()),
    );
    if let Some(instance_id) = &message.instance_id {
        metadata.insert("instance_id".to_string(), Value::String(instance_id.clone()));
    }
    NewMessage {
        content: message.content.clone(),
        peer_id: message.author.clone(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn metadata_tags_location_and_instance() {
        let message = QueuedMessage {
            id: 7,
            content: "refactor the parser".to_string(),
            author: "alice".to_string(),
            location_key: LocationKey::new("/work/app"),
            enqueued_at: Utc::now(),
            uploaded: false,
            instance_id: Some("sess-1".to_string()),
        };
        let payload = new_message(&message);
        assert_eq!(payload.peer_id, "alice");
        assert_eq!(payload.metadata["cwd"], "/work/app");
        assert_eq!(payload.metadata["instance_id"], "sess-1");
        assert!(payload.metadata.contains_key("enqueued_at"));
    }
}
