//! Recording fake of the remote memory service.

use async_trait::async_trait;
use parking_lot::Mutex;
use recall::config::HookConfig;
use recall::error::RecallError;
use recall::remote::{
    ChatQuery, ChatResponse, ContextQuery, CreatedMessage, MemoryApi, NewMessage, PeerContext,
    Session, Workspace,
};
use recall::store::{Namespace, StateStore};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Workspace { name: String },
    Session { workspace_id: String, name: String },
    Messages { session_id: String, contents: Vec<String> },
    Context { peer_id: String, search_query: String },
    Chat { query: String },
}

/// A call together with the number of queue records present when it was made.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub call: Call,
    pub queued_records: usize,
}

pub struct RecordingApi {
    store: Arc<dyn StateStore>,
    calls: Mutex<Vec<Recorded>>,
    context: Mutex<PeerContext>,
    chat_answer: Mutex<Option<String>>,
    upload_delay: Mutex<Option<Duration>>,
    pub fail_uploads: AtomicBool,
    pub fail_context: AtomicBool,
    pub fail_workspace: AtomicBool,
}

impl RecordingApi {
    pub fn new(store: Arc<dyn StateStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            calls: Mutex::new(Vec::new()),
            context: Mutex::new(PeerContext::default()),
            chat_answer: Mutex::new(None),
            upload_delay: Mutex::new(None),
            fail_uploads: AtomicBool::new(false),
            fail_context: AtomicBool::new(false),
            fail_workspace: AtomicBool::new(false),
        })
    }

    pub fn set_context(&self, context: PeerContext) {
        *self.context.lock() = context;
    }

    pub fn set_chat_answer(&self, answer: &str) {
        *self.chat_answer.lock() = Some(answer.to_string());
    }

    /// Make every message upload hang for `delay` before answering.
    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|r| r.call.clone()).collect()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|r| matches(&r.call)).count()
    }

    pub fn context_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Context { .. }))
    }

    pub fn uploaded_contents(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Messages { contents, .. } => Some(contents),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: Call) {
        let queued_records = self
            .store
            .scan_prefix(Namespace::Queue, b"")
            .map(|records| records.len())
            .unwrap_or(0);
        self.calls.lock().push(Recorded {
            call,
            queued_records,
        });
    }
}

fn unavailable() -> RecallError {
    RecallError::RemoteStatus {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl MemoryApi for RecordingApi {
    async fn get_or_create_workspace(&self, name: &str) -> Result<Workspace, RecallError> {
        self.record(Call::Workspace {
            name: name.to_string(),
        });
        if self.fail_workspace.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(Workspace {
            id: format!("ws-{}", name),
        })
    }

    async fn get_or_create_session(
        &self,
        workspace_id: &str,
        name: &str,
        _metadata: Map<String, Value>,
    ) -> Result<Session, RecallError> {
        self.record(Call::Session {
            workspace_id: workspace_id.to_string(),
            name: name.to_string(),
        });
        Ok(Session {
            id: format!("sess-{}", name),
        })
    }

    async fn create_messages(
        &self,
        _workspace_id: &str,
        session_id: &str,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<CreatedMessage>, RecallError> {
        self.record(Call::Messages {
            session_id: session_id.to_string(),
            contents: messages.iter().map(|m| m.content.clone()).collect(),
        });
        let delay = *self.upload_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(messages
            .iter()
            .enumerate()
            .map(|(i, _)| CreatedMessage {
                id: Some(format!("msg-{}", i)),
            })
            .collect())
    }

    async fn get_context(
        &self,
        _workspace_id: &str,
        peer_id: &str,
        query: &ContextQuery,
    ) -> Result<PeerContext, RecallError> {
        self.record(Call::Context {
            peer_id: peer_id.to_string(),
            search_query: query.search_query.clone(),
        });
        if self.fail_context.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.context.lock().clone())
    }

    async fn chat(
        &self,
        _workspace_id: &str,
        _peer_id: &str,
        query: &ChatQuery,
    ) -> Result<ChatResponse, RecallError> {
        self.record(Call::Chat {
            query: query.query.clone(),
        });
        Ok(ChatResponse {
            content: self.chat_answer.lock().clone(),
        })
    }
}

/// Remote context payload with the given facts and insight conclusions.
pub fn peer_context(facts: &[&str], insights: &[&str]) -> PeerContext {
    let deductive: Vec<Value> = insights
        .iter()
        .map(|c| json!({ "conclusion": c, "premises": [] }))
        .collect();
    serde_json::from_value(json!({
        "representation": { "explicit": facts, "deductive": deductive }
    }))
    .unwrap()
}

pub fn test_config() -> HookConfig {
    HookConfig::new("alice", "sk-test", "acme")
}
