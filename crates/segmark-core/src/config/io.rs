//! Editor settings persisted as YAML
//!
//! Reading never fails: when the file is absent or unusable the editor runs
//! on defaults and says so in the log.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read settings from `path`, falling back to `T::default()`
///
/// ```ignore
/// let config: EditorConfig = load_config(&default_config_path());
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("No settings at {:?}, using defaults", path);
        return T::default();
    }
    match read_yaml(path) {
        Ok(config) => {
            log::info!("Settings loaded from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Ignoring settings file: {:#}", e);
            T::default()
        }
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&text).with_context(|| format!("Invalid YAML in {:?}", path))
}

/// Write settings to `path`, creating missing directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create settings directory {:?}", dir))?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize settings")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Settings saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: EditorConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = EditorConfig::default();
        config.display.page_seconds = 2.5;
        config.tracks.mutable_track = "segments".to_string();

        save_config(&config, &path).unwrap();
        let loaded: EditorConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_yaml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "display: [not, a, map").unwrap();
        let config: EditorConfig = load_config(&path);
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "snap:\n  glottal_periods: 16\n").unwrap();
        let config: EditorConfig = load_config(&path);
        assert_eq!(config.snap.glottal_periods, 16);
        assert_eq!(config.snap.glottal_fallback_hz, 120.0);
        assert_eq!(config.display, EditorConfig::default().display);
    }
}
