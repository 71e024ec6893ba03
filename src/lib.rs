//! Recall: Prompt-Submit Memory Hook
//!
//! Mirrors each submitted prompt to a remote memory service and injects what
//! the service knows about the user back into the conversation. Prompts are
//! queued durably before any network call, remote identifiers are cached
//! locally, and the context snapshot is reused until it goes stale or enough
//! prompts have gone by.

pub mod config;
pub mod context;
pub mod error;
pub mod hook;
pub mod identity;
pub mod logging;
pub mod queue;
pub mod remote;
pub mod store;
pub mod tooling;
pub mod types;
