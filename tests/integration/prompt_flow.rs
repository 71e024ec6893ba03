use crate::integration::support::{peer_context, test_config, Call, RecordingApi};
use chrono::{Duration as ChronoDuration, Utc};
use recall::config::HookConfig;
use recall::context::{ContextCache, ContextSnapshot, RefreshReason};
use recall::hook::handler::{ContextSource, PromptHandler};
use recall::hook::HookInput;
use recall::queue::DurableQueue;
use recall::remote::MemoryApi;
use recall::store::{MemoryStateStore, StateStore};
use recall::tooling::cli::CliContext;
use recall::types::LocationKey;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CWD: &str = "/work/app";

struct Harness {
    config: Arc<HookConfig>,
    store: Arc<dyn StateStore>,
    api: Arc<RecordingApi>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: HookConfig) -> Self {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let api = RecordingApi::new(store.clone());
        Self {
            config: Arc::new(config),
            store,
            api,
        }
    }

    fn handler(&self) -> PromptHandler {
        let api: Arc<dyn MemoryApi> = self.api.clone();
        PromptHandler::new(self.config.clone(), self.store.clone(), api)
    }

    fn cache(&self) -> ContextCache {
        ContextCache::new(
            self.store.clone(),
            location(),
            self.config.cache.refresh_settings(),
        )
    }

    fn queue(&self) -> DurableQueue {
        DurableQueue::new(self.store.clone())
    }

    /// Fresh snapshot plus a counter at `count`.
    fn warm(&self, facts: &[&str], count: u32) {
        let cache = self.cache();
        let mut snapshot = ContextSnapshot::empty(Utc::now());
        snapshot.explicit_facts = facts.iter().map(|f| f.to_string()).collect();
        cache.set_snapshot(&snapshot).unwrap();
        cache.acknowledge_refresh().unwrap();
        for _ in 0..count {
            cache.increment_message_count().unwrap();
        }
    }
}

fn location() -> LocationKey {
    LocationKey::new(CWD)
}

fn input(prompt: &str) -> HookInput {
    HookInput {
        prompt: Some(prompt.to_string()),
        cwd: Some(CWD.into()),
        session_id: Some("instance-1".to_string()),
    }
}

#[tokio::test]
async fn empty_prompt_is_a_silent_noop() {
    let h = Harness::new();
    for prompt in ["", "   \n"] {
        let outcome = h.handler().handle(&input(prompt)).await;
        assert!(outcome.output.is_none());
        assert!(outcome.queued.is_none());
        assert_eq!(outcome.context_source, ContextSource::None);
    }
    let outcome = h.handler().handle(&HookInput::default()).await;
    assert!(outcome.output.is_none());

    assert!(h.api.calls().is_empty());
    assert!(h.queue().entries(&location()).unwrap().is_empty());
    assert_eq!(h.cache().message_count(), 0);
}

#[tokio::test]
async fn prompt_is_durable_before_any_remote_call() {
    let h = Harness::new();
    h.handler()
        .handle(&input("how do I add a column to the users table?"))
        .await;

    let recorded = h.api.recorded();
    assert!(!recorded.is_empty());
    assert!(recorded[0].queued_records >= 1);
}

#[tokio::test]
async fn fresh_install_resolves_ids_uploads_and_injects_context() {
    let h = Harness::new();
    h.api.set_context(peer_context(
        &["prefers postgres", "works on billing"],
        &["cares about data integrity"],
    ));

    let outcome = h
        .handler()
        .handle(&input("how do I add a column to the users table?"))
        .await;

    let calls = h.api.calls();
    assert_eq!(h.api.count(|c| matches!(c, Call::Workspace { .. })), 1);
    assert_eq!(h.api.count(|c| matches!(c, Call::Session { .. })), 1);
    assert!(calls.contains(&Call::Workspace {
        name: "acme".to_string()
    }));
    assert!(calls.contains(&Call::Session {
        workspace_id: "ws-acme".to_string(),
        name: "project-app".to_string(),
    }));
    assert_eq!(
        h.api.uploaded_contents(),
        vec!["how do I add a column to the users table?".to_string()]
    );
    assert_eq!(h.api.context_calls(), 1);

    let output = outcome.output.expect("context emitted");
    assert_eq!(
        output.context(),
        "[Memory for alice]: Relevant facts: prefers postgres; works on billing | Insights: cares about data integrity"
    );
    assert_eq!(
        outcome.context_source,
        ContextSource::Fetched(RefreshReason::Missing)
    );

    let report = outcome.upload.expect("upload ran");
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.remaining, 0);
    assert!(h.queue().entries(&location()).unwrap().is_empty());

    let h_identity = recall::identity::IdentityCache::new(h.store.clone());
    assert_eq!(h_identity.workspace_id("acme").as_deref(), Some("ws-acme"));
    assert_eq!(
        h_identity.session_id(&location()).as_deref(),
        Some("sess-project-app")
    );
    assert!(h.cache().snapshot().is_some());
    assert_eq!(h.cache().message_count(), 0);
}

#[tokio::test]
async fn second_prompt_reuses_cached_ids() {
    let h = Harness::new();
    let resolutions = |api: &RecordingApi| {
        api.count(|c| matches!(c, Call::Workspace { .. } | Call::Session { .. }))
    };
    h.handler().handle(&input("first prompt about the parser")).await;
    let after_first = resolutions(&h.api);
    assert!(after_first >= 2);

    h.handler().handle(&input("second prompt about the lexer")).await;
    assert_eq!(resolutions(&h.api), after_first);
    assert_eq!(h.api.uploaded_contents().len(), 2);
}

#[tokio::test]
async fn warm_cache_skips_context_call_and_counts_prompt() {
    let h = Harness::new();
    h.warm(&["prefers tabs"], 3);

    let outcome = h
        .handler()
        .handle(&input("rename this function everywhere please"))
        .await;

    assert_eq!(h.api.context_calls(), 0);
    assert_eq!(outcome.context_source, ContextSource::Cached);
    assert_eq!(outcome.message_count, Some(4));
    assert_eq!(h.cache().message_count(), 4);
    assert_eq!(
        outcome.output.unwrap().context(),
        "[Memory for alice]: Relevant facts: prefers tabs"
    );
}

#[tokio::test]
async fn stale_snapshot_is_refetched() {
    let h = Harness::new();
    let mut old = ContextSnapshot::empty(Utc::now() - ChronoDuration::seconds(120));
    old.explicit_facts = vec!["old fact".to_string()];
    h.cache().set_snapshot(&old).unwrap();
    h.api.set_context(peer_context(&["new fact"], &[]));

    let outcome = h
        .handler()
        .handle(&input("what changed in the release branch?"))
        .await;

    assert_eq!(
        outcome.context_source,
        ContextSource::Fetched(RefreshReason::Stale)
    );
    assert!(outcome.output.unwrap().context().contains("new fact"));
    assert_eq!(
        h.cache().snapshot().unwrap().explicit_facts,
        vec!["new fact".to_string()]
    );
}

#[tokio::test]
async fn reaching_the_threshold_forces_a_refresh() {
    let mut config = test_config();
    config.cache.refresh_threshold = 3;
    let h = Harness::with_config(config);
    h.warm(&["cached fact"], 2);
    h.api.set_context(peer_context(&["refreshed fact"], &[]));

    let outcome = h
        .handler()
        .handle(&input("explain the borrow checker error here"))
        .await;

    assert_eq!(h.api.context_calls(), 1);
    assert_eq!(
        outcome.context_source,
        ContextSource::Fetched(RefreshReason::Threshold)
    );
    assert_eq!(outcome.message_count, Some(3));
    assert_eq!(h.cache().message_count(), 0);
    assert!(outcome.output.unwrap().context().contains("refreshed fact"));
}

#[tokio::test]
async fn failed_upload_keeps_message_and_still_emits_context() {
    let h = Harness::new();
    h.api.fail_uploads.store(true, Ordering::SeqCst);
    h.api.set_context(peer_context(&["prefers postgres"], &[]));

    let outcome = h
        .handler()
        .handle(&input("write a migration for the orders table"))
        .await;

    assert!(outcome.output.is_some());
    let report = outcome.upload.expect("drain ran");
    assert_eq!(report.failed, 1);
    assert_eq!(report.remaining, 1);

    let pending = h.queue().pending(&location()).unwrap();
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].uploaded);
    assert_eq!(pending[0].content, "write a migration for the orders table");
    assert_eq!(pending[0].instance_id.as_deref(), Some("instance-1"));

    // Next invocation uploads both, oldest first.
    h.api.fail_uploads.store(false, Ordering::SeqCst);
    h.handler()
        .handle(&input("and add an index on created_at"))
        .await;
    let uploaded = h.api.uploaded_contents();
    assert_eq!(
        &uploaded[uploaded.len() - 2..],
        &[
            "write a migration for the orders table".to_string(),
            "and add an index on created_at".to_string()
        ]
    );
    assert!(h.queue().pending(&location()).unwrap().is_empty());
}

#[tokio::test]
async fn slow_upload_backlog_does_not_hold_the_hook_past_its_budget() {
    let mut config = test_config();
    config.upload_budget_ms = 300;
    let h = Harness::with_config(config);
    h.warm(&["prefers tabs"], 0);
    for text in ["offline one", "offline two", "offline three"] {
        h.queue().enqueue(text, "alice", &location(), None);
    }
    h.api.set_upload_delay(Duration::from_secs(2));

    let started = Instant::now();
    let outcome = h
        .handler()
        .handle(&input("rename this function everywhere please"))
        .await;

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert!(outcome.output.is_some());
    assert!(outcome.upload.is_none());
    assert_eq!(h.queue().pending(&location()).unwrap().len(), 4);
}

#[tokio::test]
async fn unreachable_service_degrades_to_no_output() {
    let h = Harness::new();
    h.api.fail_workspace.store(true, Ordering::SeqCst);

    let outcome = h
        .handler()
        .handle(&input("summarize the failing integration tests"))
        .await;

    assert!(outcome.output.is_none());
    assert_eq!(outcome.context_source, ContextSource::Unavailable);
    assert!(outcome.upload.is_none());
    assert_eq!(h.queue().pending(&location()).unwrap().len(), 1);
}

#[tokio::test]
async fn failed_context_call_emits_nothing_and_keeps_counting() {
    let h = Harness::new();
    h.api.fail_context.store(true, Ordering::SeqCst);

    let outcome = h
        .handler()
        .handle(&input("why is the build slower on CI than locally?"))
        .await;

    assert!(outcome.output.is_none());
    assert_eq!(outcome.context_source, ContextSource::Unavailable);
    assert!(h.cache().snapshot().is_none());
    assert_eq!(h.cache().message_count(), 1);
    assert_eq!(h.api.uploaded_contents().len(), 1);
}

#[tokio::test]
async fn trivial_prompt_is_uploaded_but_skips_context() {
    let h = Harness::new();
    h.warm(&["prefers tabs"], 1);

    for prompt in ["yes", "/clear", "short one"] {
        let outcome = h.handler().handle(&input(prompt)).await;
        assert!(outcome.output.is_none());
        assert_eq!(outcome.context_source, ContextSource::Skipped);
        assert!(outcome.queued.is_some());
    }

    assert_eq!(h.api.context_calls(), 0);
    assert_eq!(h.cache().message_count(), 1);
    assert_eq!(h.api.uploaded_contents(), vec!["yes", "/clear", "short one"]);
}

#[tokio::test]
async fn disabled_saving_neither_queues_nor_uploads() {
    let mut config = test_config();
    config.save_messages = false;
    let h = Harness::with_config(config);
    h.api.set_context(peer_context(&["prefers postgres"], &[]));

    let outcome = h
        .handler()
        .handle(&input("how do I add a column to the users table?"))
        .await;

    assert!(outcome.queued.is_none());
    assert!(outcome.upload.is_none());
    assert!(h.api.uploaded_contents().is_empty());
    assert!(h.queue().entries(&location()).unwrap().is_empty());
    assert!(outcome.output.is_some());
}

#[tokio::test]
async fn dialectic_answer_is_appended_when_enabled() {
    let mut config = test_config();
    config.dialectic = true;
    let h = Harness::with_config(config);
    h.api.set_context(peer_context(&["prefers postgres"], &[]));
    h.api.set_chat_answer("Alice is migrating billing to postgres.");

    let outcome = h
        .handler()
        .handle(&input("how do I add a column to the users table?"))
        .await;

    assert_eq!(h.api.count(|c| matches!(c, Call::Chat { .. })), 1);
    assert_eq!(
        outcome.output.unwrap().context(),
        "[Memory for alice]: Relevant facts: prefers postgres | Context: Alice is migrating billing to postgres."
    );
}

#[tokio::test]
async fn dialectic_survives_a_failed_context_call() {
    let mut config = test_config();
    config.dialectic = true;
    let h = Harness::with_config(config);
    h.api.fail_context.store(true, Ordering::SeqCst);
    h.api.set_chat_answer("Alice works on billing.");

    let outcome = h
        .handler()
        .handle(&input("how do I add a column to the users table?"))
        .await;

    assert_eq!(
        outcome.output.unwrap().context(),
        "[Memory for alice]: Context: Alice works on billing."
    );
    assert!(h.cache().snapshot().is_none());
    assert_eq!(h.cache().message_count(), 1);
}

#[tokio::test]
async fn cli_prompt_emits_one_json_line() {
    let h = Harness::new();
    h.api.set_context(peer_context(&["prefers postgres"], &[]));
    let api: Arc<dyn MemoryApi> = h.api.clone();
    let cli = CliContext::with_parts(h.config.clone(), h.store.clone(), api);

    let line = cli
        .handle_prompt(&input("how do I add a column to the users table?"))
        .await
        .unwrap();
    assert!(!line.contains('\n'));

    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    let specific = &parsed["hookSpecificOutput"];
    assert_eq!(specific["hookEventName"], "UserPromptSubmit");
    assert_eq!(
        specific["additionalContext"],
        "[Memory for alice]: Relevant facts: prefers postgres"
    );

    let silent = cli.handle_prompt(&input("ok")).await.unwrap();
    assert!(silent.is_empty());
}

#[tokio::test]
async fn cli_flush_and_status_report_queue_state() {
    let h = Harness::new();
    h.queue().enqueue("left over from a crash", "alice", &location(), None);
    let api: Arc<dyn MemoryApi> = h.api.clone();
    let cli = CliContext::with_parts(h.config.clone(), h.store.clone(), api);

    let status = cli.status(&location(), "json").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(parsed["queue"]["pending"], 1);
    assert_eq!(parsed["session"]["name"], "project-app");
    assert!(parsed["workspace"]["id"].is_null());

    let flushed = cli.flush(&location()).await.unwrap();
    assert!(flushed.starts_with("Uploaded 1 of 1"));
    assert_eq!(h.api.uploaded_contents(), vec!["left over from a crash"]);

    let status = cli.status(&location(), "text").unwrap();
    assert!(status.contains("Queue: 0 pending"));
    assert!(status.contains("Workspace: acme (ws-acme)"));
    assert!(cli.status(&location(), "yaml").is_err());
}
