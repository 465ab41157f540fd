use super::RecordStore;
use crate::core::record::RateRecord;
use anyhow::Result;
use std::sync::Mutex;
use tracing::debug;

/// In-memory record store, used where no file should be touched
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<RateRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: RateRecord) -> Self {
        Self {
            inner: Mutex::new(Some(record)),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Option<RateRecord>> {
        let record = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        debug!(found = record.is_some(), "Memory store load");
        Ok(record)
    }

    fn save(&self, record: &RateRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        debug!(status = %record.status, "Memory store save");
        *inner = Some(record.clone());
        Ok(())
    }
}
