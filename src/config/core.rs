use crate::gpu::api::BufferUsage;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlooConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
    /// Queue GLIR commands until `execute_pending` instead of running them at once.
    pub deferred: bool,
    /// Usage hint for buffers created from GLIR commands.
    pub buffer_usage: BufferUsage,
}

impl Default for GlooConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            deferred: true,
            buffer_usage: BufferUsage::DynamicDraw,
        }
    }
}

impl GlooConfig {
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Reads the config at `path`, writing the defaults there first if it is missing.
pub fn load_from(path: &Path) -> Result<GlooConfig> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    if !path.exists() {
        let default_config = GlooConfig::default();
        let toml_content = toml::to_string_pretty(&default_config)?;
        std::fs::write(path, toml_content).context("Failed to write default config")?;
        return Ok(default_config);
    }

    let content = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

pub fn load_or_create_config() -> Result<GlooConfig> {
    load_from(&get_config_path()?)
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "MetroManDevTeam", "glcache")
        .context("Couldn't determine project directory")?;
    Ok(proj_dirs.config_dir().join("glcache.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/glcache.toml");

        let config = load_from(&path).unwrap();
        assert_eq!(config, GlooConfig::default());
        assert!(path.exists());

        // Second load reads the file just written.
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glcache.toml");
        std::fs::write(&path, "log_level = \"debug\"\nbuffer_usage = \"static_draw\"\n").unwrap();

        let config = load_from(&path).unwrap();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.buffer_usage, BufferUsage::StaticDraw);
        assert!(config.deferred);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glcache.toml");
        std::fs::write(&path, "deferred = \"sometimes\"").unwrap();

        assert!(load_from(&path).is_err());
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let config = GlooConfig {
            log_level: "loud".to_string(),
            ..GlooConfig::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }
}
