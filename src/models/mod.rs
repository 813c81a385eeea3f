mod item;
mod scan;

pub use item::{Category, NormalizedItem, RawRecord, ScoredItem, SourceTier, StoredItem};
pub use scan::{ScanLogEntry, ScanStats};
