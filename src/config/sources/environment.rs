//! Environment variable source: RECALL_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "RECALL";

/// Add environment variable overlay to builder.
///
/// `RECALL_PEER_NAME` sets `peer_name`; `RECALL_CACHE__REFRESH_THRESHOLD`
/// sets `cache.refresh_threshold`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
