//! Persisted catalog snapshot
//!
//! The snapshot is a JSON array of entries in catalog order:
//!
//! ```json
//! [
//!   { "source": "good morning", "targets": ["bonjour"] },
//!   { "source": "hello", "targets": ["bonjour", "salut"] }
//! ]
//! ```
//!
//! A plain `{ phrase: [variants] }` object is accepted on load as well, so a
//! saved refresh response can be used directly.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use context_lingo::{Catalog, PhraseEntry};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// A catalog snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CatalogStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; a missing file is an empty catalog
    pub fn load(&self) -> SyncResult<Catalog> {
        if !self.path.exists() {
            debug!("No catalog snapshot at '{}'", self.path.display());
            return Ok(Catalog::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            SyncError::Store(format!("Failed to read '{}': {}", self.path.display(), e))
        })?;
        let json: Value = serde_json::from_str(&content).map_err(|e| {
            SyncError::Store(format!("Failed to parse '{}': {}", self.path.display(), e))
        })?;
        let catalog = match json {
            Value::Array(_) => {
                let entries: Vec<PhraseEntry> = serde_json::from_value(json)?;
                Catalog::from_pairs(entries.into_iter().map(|e| (e.source, e.targets)))
            }
            Value::Object(_) => Catalog::from_json_map(&json)?,
            _ => {
                return Err(SyncError::Store(format!(
                    "Invalid snapshot '{}': root must be an array or object",
                    self.path.display()
                )));
            }
        };
        debug!(
            "Loaded {} catalog entries from '{}'",
            catalog.len(),
            self.path.display()
        );
        Ok(catalog)
    }

    /// Write the snapshot atomically through a temp file in the same directory
    pub fn save(&self, catalog: &Catalog) -> SyncResult<()> {
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let temp_file = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            serde_json::to_writer_pretty(&mut writer, catalog.entries())?;
            writer.flush()?;
        }
        temp_file
            .persist(&self.path)
            .map_err(|e| SyncError::Store(format!("Failed to persist snapshot: {}", e)))?;

        info!(
            "Saved {} catalog entries to '{}'",
            catalog.len(),
            self.path.display()
        );
        Ok(())
    }
}
