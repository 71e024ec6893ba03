//! CLI Tooling
//!
//! Command-line interface for the hook and its maintenance commands. All
//! commands are scoped to one working directory.

use crate::config::HookConfig;
use crate::context::ContextCache;
use crate::error::RecallError;
use crate::hook::resolver::IdentityResolver;
use crate::hook::upload::UploadTask;
use crate::hook::{HookInput, PromptHandler};
use crate::logging::LoggingOverrides;
use crate::queue::{DurableQueue, Spool};
use crate::remote::http::HttpMemoryApi;
use crate::remote::MemoryApi;
use crate::store::memory::MemoryStateStore;
use crate::store::persistence::SledStateStore;
use crate::store::StateStore;
use crate::types::LocationKey;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Recall - memory hook for prompt submission
#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Queue prompts durably and inject remembered context")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (file, stderr, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn logging_overrides(&self) -> LoggingOverrides {
        LoggingOverrides {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
            output: self.log_output.clone(),
            file: self.log_file.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Handle a prompt-submit event read from stdin
    Prompt,
    /// Upload prompts still queued for a directory
    Flush {
        /// Directory whose queue to drain (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Show queue, identity and cache state for a directory
    Status {
        /// Directory to inspect (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Prompt => "prompt",
            Commands::Flush { .. } => "flush",
            Commands::Status { .. } => "status",
        }
    }
}

/// CLI context holding the loaded config, state store and remote client
pub struct CliContext {
    config: Arc<HookConfig>,
    store: Arc<dyn StateStore>,
    api: Arc<dyn MemoryApi>,
    /// Set when `store` is volatile because the database was busy.
    spool: Option<Arc<Spool>>,
}

impl CliContext {
    /// Create a context backed by the on-disk state and the HTTP client.
    pub fn new(config: HookConfig) -> Result<Self, RecallError> {
        let state = open_state(&config);
        let api: Arc<dyn MemoryApi> = Arc::new(HttpMemoryApi::new(
            &config.base_url,
            &config.api_key,
            config.request_timeout(),
        )?);
        Ok(Self::with_parts(Arc::new(config), state.store, api).with_spool(state.spool))
    }

    pub fn with_parts(
        config: Arc<HookConfig>,
        store: Arc<dyn StateStore>,
        api: Arc<dyn MemoryApi>,
    ) -> Self {
        Self {
            config,
            store,
            api,
            spool: None,
        }
    }

    pub fn with_spool(mut self, spool: Option<Arc<Spool>>) -> Self {
        self.spool = spool;
        self
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn StateStore> {
        Arc::clone(&self.store)
    }

    /// Execute a CLI command; the returned string goes to stdout when non-empty.
    pub async fn execute(&self, command: &Commands) -> Result<String, RecallError> {
        let started = Instant::now();
        let result = match command {
            Commands::Prompt => {
                let input = match HookInput::from_reader(std::io::stdin()) {
                    Ok(input) => input,
                    Err(e) => {
                        debug!(error = %e, "Unreadable hook input, ignoring");
                        HookInput::default()
                    }
                };
                self.handle_prompt(&input).await
            }
            Commands::Flush { cwd } => self.flush(&location_for(cwd.as_deref())?).await,
            Commands::Status { cwd, format } => {
                self.status(&location_for(cwd.as_deref())?, format)
            }
        };

        if let Err(e) = self.store.flush() {
            warn!(error = %e, "Failed to flush state store");
        }
        info!(
            command = command.name(),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    /// Run the hook for one parsed input; empty string means emit nothing.
    pub async fn handle_prompt(&self, input: &HookInput) -> Result<String, RecallError> {
        let handler = PromptHandler::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.api),
        )
        .with_spool(self.spool.clone());
        let outcome = handler.handle(input).await;
        match outcome.output {
            Some(output) => output.to_json_line(),
            None => Ok(String::new()),
        }
    }

    pub async fn flush(&self, location: &LocationKey) -> Result<String, RecallError> {
        let queue = Arc::new(DurableQueue::new(Arc::clone(&self.store)));
        let pending = queue.pending(location)?.len();
        if pending == 0 {
            return Ok(format!("Nothing queued for {}", location));
        }

        let task = UploadTask {
            queue,
            resolver: IdentityResolver::new(
                Arc::clone(&self.store),
                Arc::clone(&self.api),
                Arc::clone(&self.config),
            ),
            api: Arc::clone(&self.api),
            location: location.clone(),
        };
        let report = task.run().await?;
        Ok(format!(
            "Uploaded {} of {} queued prompts for {} ({} remaining)",
            report.uploaded, report.attempted, location, report.remaining
        ))
    }

    pub fn status(&self, location: &LocationKey, format: &str) -> Result<String, RecallError> {
        let queue = DurableQueue::new(Arc::clone(&self.store));
        let entries = queue.entries(location)?;
        let pending = entries.iter().filter(|m| !m.uploaded).count();

        let resolver = IdentityResolver::new(
            Arc::clone(&self.store),
            Arc::clone(&self.api),
            Arc::clone(&self.config),
        );
        let identity = resolver.cache();
        let workspace_id = identity.workspace_id(&self.config.workspace);
        let session_name = self.config.session_name_for(location.path());
        let session_id = identity.session_id_for(location, &session_name);

        let cache = ContextCache::new(
            Arc::clone(&self.store),
            location.clone(),
            self.config.cache.refresh_settings(),
        );
        let snapshot = cache.snapshot();
        let policy = cache.policy_state();
        let now = Utc::now();
        let snapshot_age_secs = snapshot
            .as_ref()
            .map(|s| (now - s.fetched_at).num_seconds().max(0));
        let stale = snapshot
            .as_ref()
            .map(|s| cache.snapshot_is_stale(s, now))
            .unwrap_or(true);

        match format {
            "json" => {
                let value = json!({
                    "location": location.to_string(),
                    "queue": {
                        "entries": entries.len(),
                        "pending": pending,
                    },
                    "workspace": {
                        "name": self.config.workspace,
                        "id": workspace_id,
                    },
                    "session": {
                        "name": session_name,
                        "id": session_id,
                    },
                    "peer": {
                        "name": self.config.peer_name,
                        "id": resolver.peer_id(),
                    },
                    "context": {
                        "cached": snapshot.is_some(),
                        "age_secs": snapshot_age_secs,
                        "stale": stale,
                        "messages_since_refresh": policy.messages_since_last_refresh,
                        "refresh_threshold": self.config.cache.refresh_threshold,
                    },
                });
                serde_json::to_string_pretty(&value).map_err(|e| {
                    RecallError::InvalidInput(format!("Failed to encode status: {}", e))
                })
            }
            "text" => {
                let mut out = String::new();
                out.push_str(&format!("Location: {}\n", location));
                out.push_str(&format!(
                    "Queue: {} pending, {} total\n",
                    pending,
                    entries.len()
                ));
                out.push_str(&format!(
                    "Workspace: {} ({})\n",
                    self.config.workspace,
                    workspace_id.as_deref().unwrap_or("unresolved")
                ));
                out.push_str(&format!(
                    "Session: {} ({})\n",
                    session_name,
                    session_id.as_deref().unwrap_or("unresolved")
                ));
                match snapshot_age_secs {
                    Some(age) => out.push_str(&format!(
                        "Context: cached {}s ago{}\n",
                        age,
                        if stale { ", stale" } else { "" }
                    )),
                    None => out.push_str("Context: none cached\n"),
                }
                out.push_str(&format!(
                    "Prompts since refresh: {}/{}",
                    policy.messages_since_last_refresh, self.config.cache.refresh_threshold
                ));
                Ok(out)
            }
            other => Err(RecallError::InvalidInput(format!(
                "Unknown format: {} (expected text or json)",
                other
            ))),
        }
    }
}

/// Local state for one invocation.
pub struct OpenedState {
    pub store: Arc<dyn StateStore>,
    /// Where prompts go when `store` is volatile; `None` when it is durable.
    pub spool: Option<Arc<Spool>>,
}

impl OpenedState {
    pub fn is_durable(&self) -> bool {
        self.spool.is_none()
    }

    pub fn queue(&self) -> DurableQueue {
        match &self.spool {
            Some(spool) => DurableQueue::with_spool(Arc::clone(&self.store), Arc::clone(spool)),
            None => DurableQueue::new(Arc::clone(&self.store)),
        }
    }
}

/// Open the on-disk state and absorb prompts spooled by invocations that
/// found it busy. An unusable database degrades to in-memory state, with new
/// prompts spooled to disk.
pub fn open_state(config: &HookConfig) -> OpenedState {
    let spool = match config.resolve_spool_dir() {
        Ok(dir) => Some(Arc::new(Spool::new(dir))),
        Err(e) => {
            warn!(error = %e, "No spool location");
            None
        }
    };
    let opened = config
        .resolve_state_dir()
        .and_then(|dir| SledStateStore::open(&dir).map_err(RecallError::from));

    match opened {
        Ok(store) => {
            let store: Arc<dyn StateStore> = Arc::new(store);
            if let Some(spool) = &spool {
                if let Err(e) = DurableQueue::new(Arc::clone(&store)).absorb_spool(spool) {
                    warn!(spool = %spool.dir().display(), error = %e, "Failed to absorb spooled prompts");
                }
            }
            OpenedState { store, spool: None }
        }
        Err(e) => {
            warn!(error = %e, "State database unavailable, using in-memory state");
            let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
            OpenedState { store, spool }
        }
    }
}

fn location_for(cwd: Option<&Path>) -> Result<LocationKey, RecallError> {
    match cwd {
        Some(path) => Ok(LocationKey::new(path.to_path_buf())),
        None => std::env::current_dir()
            .map(LocationKey::new)
            .map_err(|e| RecallError::InvalidInput(format!("No working directory: {}", e))),
    }
}
