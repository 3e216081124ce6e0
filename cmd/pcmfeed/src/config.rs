//! Configuration file handling.
//!
//! Configuration is stored in ~/.pcmfeed/config.yaml. Every field is
//! optional in the file; missing fields take their defaults.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pcmfeed::{DEFAULT_CHUNK_SIZE, Format, PlayerOptions, sink::DEFAULT_SLOTS};
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".pcmfeed";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Playback defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format of the PCM files.
    pub format: Format,
    /// Bytes read and queued per chunk.
    pub chunk_size: usize,
    /// Pace the output device at the real playback rate.
    pub realtime: bool,
    /// Chunks the output device holds at once.
    pub device_slots: usize,
    /// Queue configuration.
    pub player: PlayerOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: Format::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            realtime: true,
            device_slots: DEFAULT_SLOTS,
            player: PlayerOptions::default(),
        }
    }
}

/// Returns the default config file path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
}

/// Resolves the config file path, preferring `custom_path`.
pub fn config_path(custom_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => default_config_path().ok_or_else(|| anyhow::anyhow!("cannot determine config path")),
    }
}

/// Loads the configuration, falling back to defaults when the file does
/// not exist.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Writes the configuration, creating the directory as needed.
pub fn save_config(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}
