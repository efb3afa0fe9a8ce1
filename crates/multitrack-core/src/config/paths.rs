//! Standard locations for engine configuration files

use std::path::PathBuf;

/// Get the configuration directory
///
/// Returns: `<platform config dir>/multitrack`, falling back to `./multitrack`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("multitrack")
}

/// Get the default config file path
///
/// # Arguments
/// * `filename` - Config file name (e.g., "engine.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
