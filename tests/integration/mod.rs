//! Integration tests for the recall prompt hook

mod prompt_flow;
mod sled_state;
mod support;
