//! HTTP implementation of [`MemoryApi`].

use super::contract::{
    ChatQuery, ChatResponse, ContextQuery, CreatedMessage, MemoryApi, NewMessage, PeerContext,
    Session, Workspace,
};
use crate::error::RecallError;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;

const API_VERSION: &str = "v2";

#[derive(Debug, Clone)]
pub struct HttpMemoryApi {
    base_url: Url,
    api_key: String,
    http_client: reqwest::Client,
}

impl HttpMemoryApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RecallError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            RecallError::ConfigError(format!("Invalid base URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RecallError::ConfigError(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            http_client,
        })
    }

    /// `<base>/v2/<segments...>` with each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, RecallError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                RecallError::ConfigError(format!("Base URL cannot carry a path: {}", self.base_url))
            })?;
            path.pop_if_empty().push(API_VERSION);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, RecallError> {
        let start = Instant::now();
        let response = request.bearer_auth(&self.api_key).send().await?;

        let status = response.status();
        debug!(
            operation,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Remote call finished"
        );
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecallError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RecallError::RemoteDecode(format!("{}: {}", operation, e)))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        operation: &'static str,
    ) -> Result<T, RecallError> {
        let url = self.endpoint(segments)?;
        self.send(self.http_client.post(url).json(body), operation)
            .await
    }
}

#[async_trait]
impl MemoryApi for HttpMemoryApi {
    async fn get_or_create_workspace(&self, name: &str) -> Result<Workspace, RecallError> {
        self.post(&["workspaces"], &json!({ "id": name }), "workspace.get_or_create")
            .await
    }

    async fn get_or_create_session(
        &self,
        workspace_id: &str,
        name: &str,
        metadata: Map<String, Value>,
    ) -> Result<Session, RecallError> {
        self.post(
            &["workspaces", workspace_id, "sessions"],
            &json!({ "id": name, "metadata": metadata }),
            "session.get_or_create",
        )
        .await
    }

    async fn create_messages(
        &self,
        workspace_id: &str,
        session_id: &str,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<CreatedMessage>, RecallError> {
        self.post(
            &["workspaces", workspace_id, "sessions", session_id, "messages"],
            &json!({ "messages": messages }),
            "messages.create",
        )
        .await
    }

    async fn get_context(
        &self,
        workspace_id: &str,
        peer_id: &str,
        query: &ContextQuery,
    ) -> Result<PeerContext, RecallError> {
        let url = self.endpoint(&["workspaces", workspace_id, "peers", peer_id, "context"])?;
        self.send(self.http_client.get(url).query(query), "peer.context")
            .await
    }

    async fn chat(
        &self,
        workspace_id: &str,
        peer_id: &str,
        query: &ChatQuery,
    ) -> Result<ChatResponse, RecallError> {
        self.post(
            &["workspaces", workspace_id, "peers", peer_id, "chat"],
            query,
            "peer.chat",
        )
        .await
    }
}
