use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::tracker::SYMBOL_FRESHNESS_WINDOW;

pub const CONFIG_FILE_NAME: &str = "navgraph.toml";

/// Runtime settings, read from `navgraph.toml`. Every field has a default so a
/// partial file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub manifest_file_name: String,
    pub exclude_glob: String,
    pub manifest_scan_limit: usize,
    pub symbol_freshness_ms: u64,
    pub highlight_ms: u64,
    pub layout_timeout_ms: u64,
    pub state_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_file_name: "kibana.jsonc".to_owned(),
            exclude_glob: "**/node_modules/**".to_owned(),
            manifest_scan_limit: 5000,
            symbol_freshness_ms: SYMBOL_FRESHNESS_WINDOW.as_millis() as u64,
            highlight_ms: 1500,
            layout_timeout_ms: 4000,
            state_dir: None,
            log_level: "info".to_owned(),
        }
    }
}

impl Settings {
    pub fn symbol_freshness(&self) -> Duration {
        Duration::from_millis(self.symbol_freshness_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn layout_timeout(&self) -> Duration {
        Duration::from_millis(self.layout_timeout_ms)
    }

    pub fn manifest_glob(&self) -> String {
        format!("**/{}", self.manifest_file_name)
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }

    /// Directory holding the persisted graph blobs. Falls back to the platform
    /// data directory, then to `./.navgraph`.
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".navgraph"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML from config file {}", path.display()))
    }

    /// Loads the explicit path when given, otherwise the per-user config file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("failed to serialize settings to TOML")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "navgraph", "navgraph")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load_from(&dir.path().join(CONFIG_FILE_NAME))?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.symbol_freshness(), Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "symbol_freshness_ms = 500\nlog_level = \"debug\"\n")?;

        let settings = Settings::load_from(&path)?;
        assert_eq!(settings.symbol_freshness_ms, 500);
        assert_eq!(settings.log_filter(), log::LevelFilter::Debug);
        assert_eq!(settings.manifest_file_name, "kibana.jsonc");
        Ok(())
    }

    #[test]
    fn save_and_load_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let settings = Settings {
            state_dir: Some(dir.path().join("state")),
            layout_timeout_ms: 10,
            ..Settings::default()
        };
        settings.save_to(&path)?;
        assert_eq!(Settings::load_from(&path)?, settings);
        Ok(())
    }

    #[test]
    fn invalid_toml_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "symbol_freshness_ms = \"soon\"")?;
        assert!(Settings::load_from(&path).is_err());
        Ok(())
    }
}
