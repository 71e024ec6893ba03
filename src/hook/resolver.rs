//! Name -> remote id resolution through the identity cache.
//!
//! Cache hits cost nothing; misses fall back to get-or-create on the remote
//! service and record the result. The cold path yields the same ids.
//!
//! Clones share one resolution: the upload task and the context fetch run
//! concurrently, and a cold cache must still cost a single round trip each.

use crate::config::HookConfig;
use crate::error::RecallError;
use crate::identity::IdentityCache;
use crate::remote::MemoryApi;
use crate::store::StateStore;
use crate::types::LocationKey;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct IdentityResolver {
    identity: Arc<IdentityCache>,
    api: Arc<dyn MemoryApi>,
    config: Arc<HookConfig>,
    workspace: Arc<OnceCell<String>>,
    session_lock: Arc<Mutex<()>>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn StateStore>, api: Arc<dyn MemoryApi>, config: Arc<HookConfig>) -> Self {
        Self {
            identity: Arc::new(IdentityCache::new(store)),
            api,
            config,
            workspace: Arc::new(OnceCell::new()),
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.identity
    }

    pub async fn workspace_id(&self) -> Result<String, RecallError> {
        self.workspace
            .get_or_try_init(|| self.resolve_workspace_id())
            .await
            .cloned()
    }

    async fn resolve_workspace_id(&self) -> Result<String, RecallError> {
        let name = &self.config.workspace;
        if let Some(id) = self.identity.workspace_id(name) {
            return Ok(id);
        }

        debug!(workspace = %name, "Workspace id not cached, resolving remotely");
        let workspace = self.api.get_or_create_workspace(name).await?;
        if let Err(e) = self.identity.set_workspace_id(name, &workspace.id) {
            warn!(workspace = %name, error = %e, "Failed to cache workspace id");
        }
        Ok(workspace.id)
    }

    /// The user's peer id. Peers are addressed by name when no id is cached.
    pub fn peer_id(&self) -> String {
        self.identity
            .peer_id(&self.config.peer_name)
            .unwrap_or_else(|| self.config.peer_name.clone())
    }

    pub async fn session_id(
        &self,
        workspace_id: &str,
        location: &LocationKey,
    ) -> Result<String, RecallError> {
        let session_name = self.config.session_name_for(location.path());
        let _guard = self.session_lock.lock().await;
        if let Some(id) = self.identity.session_id_for(location, &session_name) {
            return Ok(id);
        }

        debug!(session = %session_name, location = %location, "Session id not cached, resolving remotely");
        let mut metadata = Map::new();
        metadata.insert("cwd".to_string(), Value::String(location.to_string()));
        let session = self
            .api
            .get_or_create_session(workspace_id, &session_name, metadata)
            .await?;
        if let Err(e) = self
            .identity
            .set_session_id(location, &session_name, &session.id)
        {
            warn!(session = %session_name, error = %e, "Failed to cache session id");
        }
        Ok(session.id)
    }
}
