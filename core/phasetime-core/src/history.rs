//! In-memory buffer of closed phase records awaiting persistence.
//!
//! Order is close order. The controller commits from [`SessionHistoryCache::peek_all`]
//! and calls [`SessionHistoryCache::clear`] only once the store confirms the write,
//! so a failed commit never loses records.

use crate::error::Result;
use crate::phase::{PhaseRecord, RecordSink};

#[derive(Debug, Default, Clone)]
pub struct SessionHistoryCache {
    records: Vec<PhaseRecord>,
}

impl SessionHistoryCache {
    pub fn new() -> Self {
        SessionHistoryCache::default()
    }

    pub fn append(&mut self, record: PhaseRecord) {
        self.records.push(record);
    }

    pub fn peek_all(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Takes every record out of the cache. Only for callers that persist
    /// the result themselves; the controller uses `peek_all` + `clear`.
    pub fn drain(&mut self) -> Vec<PhaseRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for SessionHistoryCache {
    fn accept(&mut self, record: PhaseRecord) -> Result<()> {
        self.append(record);
        Ok(())
    }
}
