use super::RecordStore;
use crate::core::record::RateRecord;
use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Keeps the record as a pretty-printed JSON file, the artifact served to the
/// static front end.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<Option<RateRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No previous record at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read record: {}", self.path.display())
                });
            }
        };

        let record = serde_json::from_str::<RateRecord>(&content)
            .with_context(|| format!("Failed to parse record: {}", self.path.display()))?;
        debug!(status = %record.status, "Loaded previous record");
        Ok(Some(record))
    }

    fn save(&self, record: &RateRecord) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut json = serde_json::to_vec_pretty(record).context("Failed to serialize record")?;
        json.push(b'\n');

        // Write next to the target so the final rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .context("Failed to write record to temp file")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write record to {}", self.path.display()))?;

        debug!(status = %record.status, "Saved record to {}", self.path.display());
        Ok(())
    }
}
