//! Built-in defaults, the lowest configuration layer.

use crate::config::{
    DEFAULT_BASE_URL, DEFAULT_CLAUDE_PEER, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_UPLOAD_BUDGET_MS,
};
use crate::context::cache::{DEFAULT_REFRESH_THRESHOLD, DEFAULT_STALENESS};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("claude_peer", DEFAULT_CLAUDE_PEER)?
        .set_default("save_messages", true)?
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS as i64)?
        .set_default("upload_budget_ms", DEFAULT_UPLOAD_BUDGET_MS as i64)?
        .set_default("dialectic", false)?
        .set_default("cache.staleness_secs", DEFAULT_STALENESS.as_secs() as i64)?
        .set_default("cache.refresh_threshold", DEFAULT_REFRESH_THRESHOLD as i64)
}
