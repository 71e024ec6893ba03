//! Fresh context retrieval.
//!
//! The semantic context call feeds the cache; the optional dialectic call
//! only adds a sentence to this turn. When both run they are issued together
//! and settle independently.

use super::resolver::IdentityResolver;
use crate::config::HookConfig;
use crate::context::ContextSnapshot;
use crate::error::RecallError;
use crate::remote::{ChatQuery, ContextQuery, MemoryApi};
use crate::types::LocationKey;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a refresh produced; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedContext {
    pub snapshot: Option<ContextSnapshot>,
    pub dialectic: Option<String>,
}

pub struct ContextFetcher {
    resolver: IdentityResolver,
    api: Arc<dyn MemoryApi>,
    config: Arc<HookConfig>,
}

impl ContextFetcher {
    pub fn new(resolver: IdentityResolver, api: Arc<dyn MemoryApi>, config: Arc<HookConfig>) -> Self {
        Self {
            resolver,
            api,
            config,
        }
    }

    pub async fn fetch(
        &self,
        prompt: &str,
        location: &LocationKey,
    ) -> Result<FetchedContext, RecallError> {
        let workspace_id = self.resolver.workspace_id().await?;
        let peer_id = self.resolver.peer_id();
        let query = ContextQuery::for_prompt(prompt);

        if !self.config.dialectic {
            let context = self.api.get_context(&workspace_id, &peer_id, &query).await?;
            return Ok(FetchedContext {
                snapshot: Some(ContextSnapshot::from_remote(context, Utc::now())),
                dialectic: None,
            });
        }

        let session_id = match self.resolver.session_id(&workspace_id, location).await {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(error = %e, "Dialectic call proceeds without session scope");
                None
            }
        };
        let chat = ChatQuery::for_prompt(&self.config.peer_name, prompt, session_id);

        let (context_result, chat_result) = futures::future::join(
            self.api.get_context(&workspace_id, &peer_id, &query),
            self.api.chat(&workspace_id, &peer_id, &chat),
        )
        .await;

        let snapshot = match context_result {
            Ok(context) => Some(ContextSnapshot::from_remote(context, Utc::now())),
            Err(e) => {
                warn!(error = %e, "Semantic context call failed");
                None
            }
        };
        let dialectic = match chat_result {
            Ok(response) => response.answer().map(str::to_string),
            Err(e) => {
                warn!(error = %e, "Dialectic call failed");
                None
            }
        };

        Ok(FetchedContext {
            snapshot,
            dialectic,
        })
    }
}
