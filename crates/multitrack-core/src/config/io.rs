//! YAML configuration files
//!
//! Loading never fails: a missing file yields defaults silently, an
//! unreadable or malformed one yields defaults with a warning. Saving
//! reports errors through `anyhow`.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse a YAML file into `T`, or return an error describing why not.
///
/// A missing file is `Ok(None)`.
pub fn try_load_config<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };
    let config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(config))
}

/// Load configuration from a YAML file, falling back to `T::default()`
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match try_load_config(path) {
        Ok(Some(config)) => {
            log::info!("load_config: Loaded {:?}", path);
            config
        }
        Ok(None) => {
            log::info!("load_config: {:?} not found, using defaults", path);
            T::default()
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            T::default()
        }
    }
}

/// Write configuration as YAML, creating parent directories as needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))?;

    log::info!("save_config: Saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        value: i32,
        name: String,
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: TestConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, TestConfig::default());
        let missing: Option<TestConfig> =
            try_load_config(Path::new("/nonexistent/path/config.yaml")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_invalid_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "value: [not, an, int").unwrap();
        assert!(try_load_config::<TestConfig>(&path).is_err());
        let config: TestConfig = load_config(&path);
        assert_eq!(config, TestConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test-config.yaml");

        let config = TestConfig {
            value: 42,
            name: "test".to_string(),
        };

        save_config(&config, &path).unwrap();
        let loaded: TestConfig = load_config(&path);

        assert_eq!(loaded, config);
    }
}
