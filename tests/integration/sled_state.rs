use recall::config::HookConfig;
use recall::context::{ContextCache, ContextSnapshot, RefreshSettings};
use recall::identity::IdentityCache;
use recall::queue::DurableQueue;
use recall::store::{SledStateStore, StateStore};
use recall::tooling::cli::open_state;
use recall::types::LocationKey;
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<dyn StateStore> {
    Arc::new(SledStateStore::open(&dir.path().join("state")).unwrap())
}

#[test]
fn queued_prompts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let loc = LocationKey::new("/work/app");

    {
        let queue = DurableQueue::new(open(&dir));
        queue.enqueue("first", "alice", &loc, None).unwrap();
        queue.enqueue("second", "alice", &loc, None).unwrap();
    }

    let queue = DurableQueue::new(open(&dir));
    let pending = queue.pending(&loc).unwrap();
    let contents: Vec<_> = pending.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert!(pending[0].id < pending[1].id);
}

#[test]
fn queues_are_scoped_per_directory() {
    let dir = TempDir::new().unwrap();
    let queue = DurableQueue::new(open(&dir));
    let app = LocationKey::new("/work/app");
    let app2 = LocationKey::new("/work/app2");

    queue.enqueue("for app", "alice", &app, None).unwrap();
    queue.enqueue("for app2", "alice", &app2, None).unwrap();

    assert_eq!(queue.pending(&app).unwrap().len(), 1);
    assert_eq!(queue.pending(&app2).unwrap()[0].content, "for app2");
}

#[test]
fn identity_and_context_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let loc = LocationKey::new("/work/app");
    let fetched_at = Utc::now();

    {
        let store = open(&dir);
        let identity = IdentityCache::new(store.clone());
        identity.set_workspace_id("acme", "ws-1").unwrap();
        identity.set_session_id(&loc, "project-app", "sess-1").unwrap();

        let cache = ContextCache::new(store.clone(), loc.clone(), RefreshSettings::default());
        let mut snapshot = ContextSnapshot::empty(fetched_at);
        snapshot.explicit_facts = vec!["prefers postgres".to_string()];
        cache.set_snapshot(&snapshot).unwrap();
        cache.increment_message_count().unwrap();
        cache.increment_message_count().unwrap();
        store.flush().unwrap();
    }

    let store = open(&dir);
    let identity = IdentityCache::new(store.clone());
    assert_eq!(identity.workspace_id("acme").as_deref(), Some("ws-1"));
    assert_eq!(
        identity.session_id_for(&loc, "project-app").as_deref(),
        Some("sess-1")
    );
    assert_eq!(identity.session_id_for(&loc, "renamed"), None);

    let cache = ContextCache::new(store, loc, RefreshSettings::default());
    let snapshot = cache.snapshot().unwrap();
    assert_eq!(snapshot.explicit_facts, vec!["prefers postgres"]);
    assert_eq!(snapshot.fetched_at, fetched_at);
    assert_eq!(cache.message_count(), 2);
}

#[test]
fn concurrent_increments_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let loc = LocationKey::new("/work/app");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let loc = loc.clone();
            std::thread::spawn(move || {
                let cache = ContextCache::new(store, loc, RefreshSettings::default());
                for _ in 0..25 {
                    cache.increment_message_count().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let cache = ContextCache::new(store, loc, RefreshSettings::default());
    assert_eq!(cache.message_count(), 200);
}

#[test]
fn prompt_from_a_session_locked_out_of_the_database_survives() {
    let dir = TempDir::new().unwrap();
    let mut config = HookConfig::new("alice", "sk-test", "acme");
    config.state_dir = Some(dir.path().join("state"));
    let loc = LocationKey::new("/work/app");

    let first = open_state(&config);
    assert!(first.is_durable());
    first.queue().enqueue("from the first session", "alice", &loc, Some("one"));

    // The first handle still holds the database lock.
    let second = open_state(&config);
    assert!(!second.is_durable());
    second
        .queue()
        .enqueue("from the second session", "alice", &loc, Some("two"))
        .unwrap();

    drop(second);
    drop(first);

    let reopened = open_state(&config);
    assert!(reopened.is_durable());
    let pending = reopened.queue().pending(&loc).unwrap();
    let contents: Vec<_> = pending.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["from the first session", "from the second session"]);
    assert_eq!(pending[1].instance_id.as_deref(), Some("two"));

    // Absorbed exactly once.
    drop(reopened);
    let again = open_state(&config);
    assert_eq!(again.queue().pending(&loc).unwrap().len(), 2);
}
