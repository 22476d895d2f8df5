use crate::storage::LayoutStore;
use crate::utils::app_paths::AppPaths;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// JSON file holding every storage key's entry
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// one is logged and treated as empty, and is replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries: BTreeMap<String, Value> = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read layout store {:?}", path))?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt layout store {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened layout store {:?} ({} entries)", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        Self::open(AppPaths::layouts_file()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        // Write beside the target then rename so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

impl LayoutStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    /// Memory is only updated once the file write succeeded
    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}
