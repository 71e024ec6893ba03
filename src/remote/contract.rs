//! Request/response contract of the remote memory service.
//!
//! Every response field is optional on the wire; absent fields deserialize to
//! empty values so nothing downstream handles partially-specified payloads.

use crate::error::RecallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters of the prompt sent as the semantic search query.
pub const SEARCH_QUERY_MAX_CHARS: usize = 500;
/// Characters of the prompt quoted in the dialectic question.
pub const CHAT_PROMPT_MAX_CHARS: usize = 200;

pub const SEARCH_TOP_K: u32 = 10;
pub const SEARCH_MAX_DISTANCE: f32 = 0.7;
pub const MAX_OBSERVATIONS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workspace {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub id: String,
}

/// One message in an ingestion batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub content: String,
    pub peer_id: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedMessage {
    #[serde(default)]
    pub id: Option<String>,
}

/// Parameters of the semantic context call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextQuery {
    pub search_query: String,
    pub search_top_k: u32,
    pub search_max_distance: f32,
    pub max_observations: u32,
    pub include_most_derived: bool,
}

impl ContextQuery {
    pub fn for_prompt(prompt: &str) -> Self {
        Self {
            search_query: truncate_chars(prompt, SEARCH_QUERY_MAX_CHARS),
            search_top_k: SEARCH_TOP_K,
            search_max_distance: SEARCH_MAX_DISTANCE,
            max_observations: MAX_OBSERVATIONS,
            include_most_derived: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatQuery {
    pub fn for_prompt(peer_name: &str, prompt: &str, session_id: Option<String>) -> Self {
        Self {
            query: format!(
                "Based on what you know about {}, what context is relevant to this query: \"{}\"? Answer in 1-2 sentences.",
                peer_name,
                truncate_chars(prompt, CHAT_PROMPT_MAX_CHARS)
            ),
            session_id,
        }
    }
}

/// Explicit observations arrive either as bare strings or as objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExplicitObservation {
    Text(String),
    Structured { content: String },
    Other(Value),
}

impl ExplicitObservation {
    pub fn content(&self) -> Option<&str> {
        match self {
            ExplicitObservation::Text(text) => Some(text),
            ExplicitObservation::Structured { content } => Some(content),
            ExplicitObservation::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeductiveObservation {
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub premises: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Representation {
    #[serde(default)]
    pub explicit: Vec<ExplicitObservation>,
    #[serde(default)]
    pub deductive: Vec<DeductiveObservation>,
}

/// Result of the semantic context call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PeerContext {
    #[serde(default)]
    pub representation: Option<Representation>,
    #[serde(default)]
    pub peer_card: Option<Vec<String>>,
}

/// Result of the dialectic call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// The answer, if the service produced a non-blank one.
    pub fn answer(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Remote memory service operations used by the hook.
///
/// Every call is fallible and network-bound.
#[async_trait]
pub trait MemoryApi: Send + Sync {
    async fn get_or_create_workspace(&self, name: &str) -> Result<Workspace, RecallError>;

    async fn get_or_create_session(
        &self,
        workspace_id: &str,
        name: &str,
        metadata: Map<String, Value>,
    ) -> Result<Session, RecallError>;

    async fn create_messages(
        &self,
        workspace_id: &str,
        session_id: &str,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<CreatedMessage>, RecallError>;

    async fn get_context(
        &self,
        workspace_id: &str,
        peer_id: &str,
        query: &ContextQuery,
    ) -> Result<PeerContext, RecallError>;

    async fn chat(
        &self,
        workspace_id: &str,
        peer_id: &str,
        query: &ChatQuery,
    ) -> Result<ChatResponse, RecallError>;
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
