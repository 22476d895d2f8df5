use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "tablekit";

pub struct AppPaths;

impl AppPaths {
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join(APP_DIR);

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Cannot determine config directory"))?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// JSON file holding persisted column layouts, keyed by storage key
    pub fn layouts_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("layouts.json"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = Self::data_dir()?.join("logs");
        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }
}
