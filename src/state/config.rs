use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::playback::{PlaybackOptions, Speed};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Position poll period while playing.
    pub poll_interval_ms: u64,
    /// mpv executable. Used as given, never searched for beyond `PATH`.
    pub mpv_path: PathBuf,
    pub aspect_ratio: Option<String>,
    pub show_title: bool,
    pub default_speed: Speed,
    pub command_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            mpv_path: PathBuf::from("mpv"),
            aspect_ratio: Some("16:9".to_string()),
            show_title: false,
            default_speed: Speed::X1,
            command_buffer: 64,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {:?}", path))
    }

    /// Loads `path` if it exists, falling back to defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(&self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reel")
            .join("config.toml")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            aspect_ratio: self.aspect_ratio.clone(),
            show_title: self.show_title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            poll_interval_ms: 250,
            mpv_path: PathBuf::from("/opt/mpv/bin/mpv"),
            aspect_ratio: Some("4:3".to_string()),
            show_title: true,
            default_speed: Speed::X4,
            command_buffer: 8,
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("poll_interval_ms = 100\n").unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.mpv_path, PathBuf::from("mpv"));
        assert_eq!(config.aspect_ratio.as_deref(), Some("16:9"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
