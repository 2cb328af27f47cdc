//! Configuration collection: locate and read the three TOML documents,
//! delegating parsing and validation to `sunbeam_core::config`.

use std::fs;
use std::path::Path;

use tracing::info;

use sunbeam_core::config::{self, DataSourceConfig, SunbeamConfig};
use sunbeam_core::{ConfigError, Event, TimeSeriesTarget};

/// Name of the primary config file within the config directory.
pub const PRIMARY_CONFIG_FILE: &str = "sunbeam.toml";

fn read(path: &Path) -> Result<String, ConfigError> {
    info!(path = %path.display(), "trying to find config");
    fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        what: path.display().to_string(),
        message: format!("cannot read file: {e}"),
    })
}

/// Load and parse the primary config file.
pub fn primary_config(
    config_dir: &Path,
) -> Result<(SunbeamConfig, DataSourceConfig, DataSourceConfig), ConfigError> {
    let path = config_dir.join(PRIMARY_CONFIG_FILE);
    let text = read(&path)?;
    let parsed = config::parse_primary_config(&text)?;
    info!(path = %path.display(), "acquired config");
    Ok(parsed)
}

/// Load and parse the ingress description referenced by the primary config.
pub fn targets(config_dir: &Path, file: &str) -> Result<Vec<TimeSeriesTarget>, ConfigError> {
    config::collect_targets(&read(&config_dir.join(file))?)
}

/// Load and parse the events description referenced by the primary config.
pub fn events(config_dir: &Path, file: &str) -> Result<Vec<Event>, ConfigError> {
    config::collect_events(&read(&config_dir.join(file))?)
}
