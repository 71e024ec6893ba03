//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::HookConfig;
use crate::error::RecallError;
use std::path::Path;
use tracing::debug;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the hook configuration.
    ///
    /// `Ok(None)` when no source supplies the peer, API key and workspace; the
    /// hook then does nothing.
    pub fn load(explicit: Option<&Path>) -> Result<Option<HookConfig>, RecallError> {
        let config = MergeService::load(explicit)?;
        if !config.is_complete() {
            debug!("Configuration incomplete, memory features disabled");
            return Ok(None);
        }
        config.validate().map_err(RecallError::ConfigError)?;
        Ok(Some(config))
    }
}
