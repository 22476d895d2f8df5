use crate::export::data_exporter::ExportFormat;
use crate::state::selection::SelectionPolicy;
use crate::utils::app_paths::AppPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub pagination: PaginationConfig,
    pub selection: SelectionConfig,
    pub search: SearchConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows per page for new tables
    pub default_per_page: usize,

    /// Page sizes offered in the page-size picker
    pub per_page_options: Vec<usize>,

    /// Page numbers shown before collapsing into ellipses
    pub max_visible_pages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// "page" or "across_pages"
    pub policy: SelectionPolicy,

    /// Drop the selection whenever the displayed page changes
    pub clear_on_page_change: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search is applied
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name without extension
    pub default_file_name: String,

    /// Output directory; current directory when unset
    pub directory: Option<PathBuf>,

    /// "csv" or "json"
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,

    /// Also write logs to a timestamped file in the data directory
    pub log_to_file: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            per_page_options: vec![10, 25, 50, 100],
            max_visible_pages: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 800 }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_file_name: "table-export".to_string(),
            directory: None,
            format: ExportFormat::Csv,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl TableConfig {
    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = AppPaths::config_file()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in {:?}", path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TableConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Directory exports are written to
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
