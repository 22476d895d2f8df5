use crate::data::column_model::ColumnDescriptor;
use crate::data::row::Row;
use crate::render::cell_renderer::CellRenderer;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Which rows an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    /// The filtered, sorted rows the table currently shows
    #[default]
    Visible,
    /// Every server page, fetched before anything is written
    AllPages,
}

/// Where serialized exports end up
pub trait ExportTarget: Send + Sync {
    /// Persist `contents` under `file_name` and return the final location
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf>;
}

/// Writes export files into a directory
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportTarget for DirectoryTarget {
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create export directory {:?}", self.dir))?;
        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!(".{}.tmp", file_name));
        fs::write(&tmp, contents).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to create {:?}", path))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub row_count: usize,
    pub format: ExportFormat,
}

/// Serializes rows the way they are rendered on screen
pub struct DataExporter;

impl DataExporter {
    /// Columns that make it into an export: the given visible columns in
    /// order, minus the actions column
    fn export_columns<'a>(columns: &[&'a ColumnDescriptor]) -> Vec<&'a ColumnDescriptor> {
        columns.iter().copied().filter(|c| !c.is_actions()).collect()
    }

    pub fn to_csv_string<R: Row>(
        rows: &[&R],
        columns: &[&ColumnDescriptor],
        renderer: &CellRenderer<R>,
    ) -> Result<String> {
        let columns = Self::export_columns(columns);
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record(columns.iter().map(|c| c.label.as_str()))?;
        for row in rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| renderer.render_cell(row, &c.key).to_plain_string()),
            )?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to finish CSV output: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Object keys for a JSON export: the column label, or "label (key)"
    /// when an earlier column already uses that label
    fn json_keys(columns: &[&ColumnDescriptor]) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let mut key = column.label.clone();
            if keys.contains(&key) {
                key = format!("{} ({})", column.label, column.key);
            }
            let mut n = 2;
            while keys.contains(&key) {
                key = format!("{} ({} {})", column.label, column.key, n);
                n += 1;
            }
            keys.push(key);
        }
        keys
    }

    /// JSON array of objects keyed by column label
    pub fn to_json_string<R: Row>(
        rows: &[&R],
        columns: &[&ColumnDescriptor],
        renderer: &CellRenderer<R>,
    ) -> Result<String> {
        let columns = Self::export_columns(columns);
        let keys = Self::json_keys(&columns);
        let json_array: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut json_obj = Map::new();
                for (column, key) in columns.iter().zip(&keys) {
                    let text = renderer.render_cell(row, &column.key).to_plain_string();
                    json_obj.insert(key.clone(), Value::String(text));
                }
                Value::Object(json_obj)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&json_array)?)
    }

    /// Serialize and hand the result to `target`. An empty row set is an
    /// error and nothing is written.
    pub fn export<R: Row>(
        rows: &[&R],
        columns: &[&ColumnDescriptor],
        renderer: &CellRenderer<R>,
        format: ExportFormat,
        file_name: &str,
        target: &dyn ExportTarget,
    ) -> Result<ExportSummary> {
        if rows.is_empty() {
            return Err(anyhow!("No data to export"));
        }

        let contents = match format {
            ExportFormat::Csv => Self::to_csv_string(rows, columns, renderer)?,
            ExportFormat::Json => Self::to_json_string(rows, columns, renderer)?,
        };

        let file_name = Self::file_name_with_extension(file_name, format);
        let path = target.save(&file_name, contents.as_bytes())?;
        debug!("Wrote {} bytes to {:?}", contents.len(), path);

        Ok(ExportSummary {
            path,
            row_count: rows.len(),
            format,
        })
    }

    fn file_name_with_extension(file_name: &str, format: ExportFormat) -> String {
        let extension = format.extension();
        if Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            file_name.to_string()
        } else {
            format!("{}.{}", file_name, extension)
        }
    }
}
