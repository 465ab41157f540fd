pub mod disk;
pub mod memory;

use crate::core::record::RateRecord;
use anyhow::Result;

/// Storage for the single current rate record.
pub trait RecordStore: Send + Sync {
    /// `Ok(None)` when no record has been written yet. A record that exists
    /// but cannot be read or parsed is an `Err`, so callers can tell it apart
    /// from a first run.
    fn load(&self) -> Result<Option<RateRecord>>;

    /// Replaces the stored record. Readers never observe a partial write.
    fn save(&self, record: &RateRecord) -> Result<()>;
}
