use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use playchip_core::layout::DEFAULT_INI;
use playchip_core::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaychipConfig {
    /// Directory holding the patched copy of the game.
    pub install_dir: Option<PathBuf>,
    /// Configuration file the game is pointed at on every run.
    pub ini_file: String,
}

impl Default for PlaychipConfig {
    fn default() -> Self {
        Self {
            install_dir: None,
            ini_file: DEFAULT_INI.to_string(),
        }
    }
}

impl PlaychipConfig {
    /// Configured install directory, or `<data dir>/Playchip/bin`.
    pub fn install_dir(&self) -> Option<PathBuf> {
        self.install_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("Playchip").join("bin")))
    }
}

pub fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("Playchip");
    base.push("config.json");
    Some(base)
}

/// Reads the config file. A missing file gives the defaults; a file that
/// exists but does not parse is an error.
pub fn load_config() -> Result<PlaychipConfig> {
    let Some(path) = config_path() else {
        return Ok(PlaychipConfig::default());
    };
    if !path.exists() {
        return Ok(PlaychipConfig::default());
    }

    let data = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn save_config(cfg: &PlaychipConfig) -> Result<()> {
    let Some(path) = config_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(cfg)?)?;
    Ok(())
}
