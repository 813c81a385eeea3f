use chrono::{DateTime, Utc};

/// Counters for one pipeline run; the ScanLog row is written from these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Pre-collapse batch size, malformed-dropped records included.
    pub raw_count: usize,
    /// Records dropped by the normalizer (empty url/title).
    pub dropped_count: usize,
    pub new_count: usize,
    pub updated_count: usize,
    pub unchanged_count: usize,
    /// New or updated items that also met the relevance floor.
    pub fresh_count: usize,
}

impl ScanStats {
    /// Everything requiring fresh attention this run.
    pub fn dedup_count(&self) -> usize {
        self.new_count + self.updated_count
    }
}

/// One append-only scan_log row.
#[derive(Debug, Clone)]
pub struct ScanLogEntry {
    pub id: i64,
    pub scanned_at: DateTime<Utc>,
    pub raw_count: i64,
    pub dedup_count: i64,
    pub fresh_count: i64,
}
