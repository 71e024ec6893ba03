//! UserPromptSubmit hook.
//!
//! # Flow
//! 1. Parse stdin; empty or malformed input is a silent no-op
//! 2. Queue the prompt durably, before any network call
//! 3. Upload pending prompts in a background task
//! 4. Decide between cached and fresh context (skipped for trivial prompts)
//! 5. Emit at most one JSON line, after the upload task settled

pub mod fetch;
pub mod handler;
pub mod input;
pub mod output;
pub mod resolver;
pub mod trivial;
pub mod upload;

pub use handler::PromptHandler;
pub use input::HookInput;
pub use output::HookOutput;
pub use trivial::is_trivial_prompt;
