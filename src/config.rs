//! Configuration
//!
//! `HookConfig` is the config provider's view for the hook: who the user is,
//! where the memory service lives, how sessions map to directories, and the
//! cache/logging knobs. Loading is layered, see [`ConfigLoader`].

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::context::RefreshSettings;
use crate::error::RecallError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.honcho.dev";
pub(crate) const DEFAULT_CLAUDE_PEER: &str = "claude";
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub(crate) const DEFAULT_UPLOAD_BUDGET_MS: u64 = 4000;

fn default_claude_peer() -> String {
    DEFAULT_CLAUDE_PEER.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_upload_budget_ms() -> u64 {
    DEFAULT_UPLOAD_BUDGET_MS
}

fn default_true() -> bool {
    true
}

fn default_staleness_secs() -> u64 {
    crate::context::cache::DEFAULT_STALENESS.as_secs()
}

fn default_refresh_threshold() -> u32 {
    crate::context::cache::DEFAULT_REFRESH_THRESHOLD
}

/// Context cache tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,

    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_staleness_secs(),
            refresh_threshold: default_refresh_threshold(),
        }
    }
}

impl CacheConfig {
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            staleness: Duration::from_secs(self.staleness_secs),
            threshold: self.refresh_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// The user's peer name in the memory service.
    #[serde(default)]
    pub peer_name: String,

    #[serde(default)]
    pub api_key: String,

    /// Workspace name in the memory service.
    #[serde(default)]
    pub workspace: String,

    /// Peer name of the assistant.
    #[serde(default = "default_claude_peer")]
    pub claude_peer: String,

    /// Mirror prompts to the memory service.
    #[serde(default = "default_true")]
    pub save_messages: bool,

    /// Absolute directory path -> session name.
    #[serde(default)]
    pub sessions: HashMap<String, String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long the hook waits for its upload pass, counted from the start
    /// of the invocation. Prompts not uploaded by then stay queued.
    #[serde(default = "default_upload_budget_ms")]
    pub upload_budget_ms: u64,

    /// Also ask the service's conversational endpoint when refreshing context.
    #[serde(default)]
    pub dialectic: bool,

    /// Location of the local state database; None means the XDG default.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HookConfig {
    /// Minimal config with defaults for everything but identity.
    pub fn new(peer_name: &str, api_key: &str, workspace: &str) -> Self {
        Self {
            peer_name: peer_name.to_string(),
            api_key: api_key.to_string(),
            workspace: workspace.to_string(),
            claude_peer: default_claude_peer(),
            save_messages: true,
            sessions: HashMap::new(),
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            upload_budget_ms: default_upload_budget_ms(),
            dialectic: false,
            state_dir: None,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Whether the identity fields needed to talk to the service are present.
    pub fn is_complete(&self) -> bool {
        !self.peer_name.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.workspace.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn upload_budget(&self) -> Duration {
        Duration::from_millis(self.upload_budget_ms)
    }

    /// Session name explicitly configured for `path`.
    pub fn session_for_path(&self, path: &Path) -> Option<&str> {
        self.sessions
            .get(path.to_string_lossy().as_ref())
            .map(String::as_str)
    }

    /// Configured session name for `path`, else `project-<dirname>`.
    pub fn session_name_for(&self, path: &Path) -> String {
        match self.session_for_path(path) {
            Some(name) => name.to_string(),
            None => default_session_name(path),
        }
    }

    pub fn resolve_state_dir(&self) -> Result<PathBuf, RecallError> {
        match &self.state_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => xdg::state_db_dir(),
        }
    }

    /// Spool directory next to the state database.
    pub fn resolve_spool_dir(&self) -> Result<PathBuf, RecallError> {
        Ok(self.resolve_state_dir()?.with_file_name("spool"))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than 0".to_string());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("Invalid base_url: {}", self.base_url));
        }
        Ok(())
    }
}

/// `project-<basename>`, lowercased, anything outside `[a-z0-9-_]` as `-`.
pub fn default_session_name(path: &Path) -> String {
    let dir_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let sanitized: String = dir_name
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("project-{}", sanitized)
}
