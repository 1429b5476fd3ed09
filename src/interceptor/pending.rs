//! Request-scoped registry of pending finalize records.

use std::collections::HashMap;

use crate::interceptor::sink::{CaptureBuffer, OutputSink};
use crate::keys::CacheKey;

/// State saved in BEFORE and consumed in AFTER.
pub struct FinalizeRecord {
    /// The sink that was active before capture started.
    pub original: Box<dyn OutputSink>,
    /// Handle to the installed capture buffer.
    pub buffer: CaptureBuffer,
}

impl std::fmt::Debug for FinalizeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizeRecord")
            .field("buffered_bytes", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Key → record map owned by one request.
#[derive(Debug, Default)]
pub struct PendingFinalize {
    records: HashMap<CacheKey, FinalizeRecord>,
}

impl PendingFinalize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record. A record already under `key` is returned.
    pub fn register(&mut self, key: CacheKey, record: FinalizeRecord) -> Option<FinalizeRecord> {
        self.records.insert(key, record)
    }

    /// Remove and return the record for `key`. Each record is handed out once.
    pub fn take(&mut self, key: &CacheKey) -> Option<FinalizeRecord> {
        self.records.remove(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
