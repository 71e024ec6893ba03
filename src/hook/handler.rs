//! Prompt handler: the orchestrator behind `recall prompt`.
//!
//! Start -> Queued -> (UploadInFlight || ContextDecision) -> Emit -> Exit.
//! The upload gets a fixed budget from the start of the invocation.
//! Nothing in here returns an error: every step degrades on its own so a
//! context failure cannot cost durability and an upload failure cannot cost
//! context.

use super::fetch::ContextFetcher;
use super::input::HookInput;
use super::output::HookOutput;
use super::resolver::IdentityResolver;
use super::trivial::is_trivial_prompt;
use super::upload::UploadTask;
use crate::config::HookConfig;
use crate::context::format::context_parts;
use crate::context::{format_context, refresh_reason, render_context, ContextCache, RefreshReason};
use crate::queue::{DrainReport, DurableQueue, Spool};
use crate::remote::MemoryApi;
use crate::store::StateStore;
use crate::types::{LocationKey, QueuedMessageId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the emitted context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// No prompt, nothing processed.
    None,
    /// Trivial prompt, decision skipped.
    Skipped,
    /// Fresh cached snapshot reused.
    Cached,
    /// Refetched for the given reason.
    Fetched(RefreshReason),
    /// Refetch failed; nothing injected.
    Unavailable,
}

/// Result of one hook invocation, for the caller and for tests.
#[derive(Debug, Clone)]
pub struct PromptOutcome {
    pub output: Option<HookOutput>,
    pub queued: Option<QueuedMessageId>,
    pub context_source: ContextSource,
    /// Counter value after this prompt, when it was counted.
    pub message_count: Option<u32>,
    /// Drain report of the upload task, when it ran to completion.
    pub upload: Option<DrainReport>,
}

impl PromptOutcome {
    fn noop() -> Self {
        Self {
            output: None,
            queued: None,
            context_source: ContextSource::None,
            message_count: None,
            upload: None,
        }
    }
}

pub struct PromptHandler {
    config: Arc<HookConfig>,
    store: Arc<dyn StateStore>,
    api: Arc<dyn MemoryApi>,
    spool: Option<Arc<Spool>>,
}

impl PromptHandler {
    pub fn new(config: Arc<HookConfig>, store: Arc<dyn StateStore>, api: Arc<dyn MemoryApi>) -> Self {
        Self {
            config,
            store,
            api,
            spool: None,
        }
    }

    /// Mirror queued prompts into `spool`; used when `store` is volatile.
    pub fn with_spool(mut self, spool: Option<Arc<Spool>>) -> Self {
        self.spool = spool;
        self
    }

    pub async fn handle(&self, input: &HookInput) -> PromptOutcome {
        let start = Instant::now();

        let Some(prompt) = input.prompt_text() else {
            debug!("Empty prompt, nothing to do");
            return PromptOutcome::noop();
        };
        let location = input.location();
        let queue = Arc::new(match &self.spool {
            Some(spool) => DurableQueue::with_spool(self.store.clone(), spool.clone()),
            None => DurableQueue::new(self.store.clone()),
        });
        let resolver =
            IdentityResolver::new(self.store.clone(), self.api.clone(), self.config.clone());

        // Queued: durable before any network call.
        let queued = if self.config.save_messages {
            queue.enqueue(
                prompt,
                &self.config.peer_name,
                &location,
                input.session_id.as_deref(),
            )
        } else {
            None
        };

        // UploadInFlight
        let upload = self.config.save_messages.then(|| {
            let task = UploadTask {
                queue: queue.clone(),
                resolver: resolver.clone(),
                api: self.api.clone(),
                location: location.clone(),
            };
            tokio::spawn(task.run_logged())
        });

        // ContextDecision, concurrently with the upload.
        let (context, context_source, message_count) =
            self.decide_context(prompt, &location, resolver).await;

        // Exit waits for the upload, up to the budget.
        let upload = match upload {
            Some(mut handle) => {
                let deadline = tokio::time::Instant::from_std(start) + self.config.upload_budget();
                match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(Ok(report)) => report,
                    Ok(Err(e)) => {
                        warn!(error = %e, "Upload task did not complete");
                        None
                    }
                    Err(_) => {
                        handle.abort();
                        warn!(
                            budget_ms = self.config.upload_budget_ms,
                            "Upload pass out of time, remaining prompts stay queued"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let output = HookOutput::additional_context(context);
        info!(
            location = %location,
            queued = queued.is_some(),
            context_source = ?context_source,
            message_count,
            emitted = output.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prompt handled"
        );

        PromptOutcome {
            output,
            queued,
            context_source,
            message_count,
            upload,
        }
    }

    async fn decide_context(
        &self,
        prompt: &str,
        location: &LocationKey,
        resolver: IdentityResolver,
    ) -> (String, ContextSource, Option<u32>) {
        if is_trivial_prompt(prompt) {
            debug!("Trivial prompt, skipping context");
            return (String::new(), ContextSource::Skipped, None);
        }

        let cache = ContextCache::new(
            self.store.clone(),
            location.clone(),
            self.config.cache.refresh_settings(),
        );
        let count = match cache.increment_message_count() {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Failed to count prompt");
                None
            }
        };

        let snapshot = cache.snapshot();
        let stale = snapshot
            .as_ref()
            .map(|s| cache.snapshot_is_stale(s, Utc::now()))
            .unwrap_or(true);
        let force = count.map(|n| cache.threshold_reached(n)).unwrap_or(false);

        let reason = match (refresh_reason(snapshot.is_some(), stale, force), snapshot) {
            (None, Some(snapshot)) => {
                debug!(message_count = count, "Using cached context");
                let context = format_context(&self.config.peer_name, &snapshot);
                return (context, ContextSource::Cached, count);
            }
            (Some(reason), _) => reason,
            (None, None) => RefreshReason::Missing,
        };

        debug!(reason = reason.as_str(), message_count = count, "Refreshing context");
        let fetcher = ContextFetcher::new(resolver, self.api.clone(), self.config.clone());
        let fetched = match fetcher.fetch(prompt, location).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(reason = reason.as_str(), error = %e, "Context fetch failed, continuing without");
                return (String::new(), ContextSource::Unavailable, count);
            }
        };

        let mut parts = Vec::new();
        if let Some(snapshot) = &fetched.snapshot {
            if let Err(e) = cache.set_snapshot(snapshot) {
                warn!(error = %e, "Failed to cache context snapshot");
            }
            if let Err(e) = cache.acknowledge_refresh() {
                warn!(error = %e, "Failed to reset refresh counter");
            }
            parts.extend(context_parts(snapshot));
        }
        if let Some(answer) = &fetched.dialectic {
            parts.push(format!("Context: {}", answer));
        }

        let source = if fetched.snapshot.is_some() || fetched.dialectic.is_some() {
            ContextSource::Fetched(reason)
        } else {
            ContextSource::Unavailable
        };
        (render_context(&self.config.peer_name, &parts), source, count)
    }
}
