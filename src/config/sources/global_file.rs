//! Global config file source: `$XDG_CONFIG_HOME/recall/config.{json,toml}`

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};

/// Add the global config file to builder when it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let stem = match xdg::global_config_stem() {
        Ok(stem) => stem,
        Err(e) => {
            tracing::debug!(error = %e, "No global config location");
            return Ok(builder);
        }
    };
    let Some(stem) = stem.to_str() else {
        tracing::warn!("Global config path is not valid UTF-8: {:?}", stem);
        return Ok(builder);
    };
    Ok(builder.add_source(File::with_name(stem).required(false)))
}
