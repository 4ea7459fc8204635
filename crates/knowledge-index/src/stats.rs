//! Stats and health reports.

use std::collections::BTreeMap;

use serde::Serialize;

/// Window for `recent_additions`, in days.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Snapshot of the store and the in-memory index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    /// Records in the durable store
    pub total_entries: u64,
    /// Vectors in the in-memory index
    pub index_size: u64,
    /// Record count per content type
    pub content_types: BTreeMap<String, u64>,
    /// Records created within the recent window
    pub recent_additions: u64,
    pub model_name: String,
    pub embedding_dimension: usize,
}

/// Drift between the durable store and the in-memory index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHealth {
    pub total_entries: u64,
    pub index_size: u64,
    /// `total_entries - index_size`. Negative after out-of-band deletes,
    /// positive after writes that bypassed the index.
    pub drift: i64,
    pub in_sync: bool,
}

impl IndexHealth {
    pub fn new(total_entries: u64, index_size: u64) -> Self {
        let drift = total_entries as i64 - index_size as i64;
        Self {
            total_entries,
            index_size,
            drift,
            in_sync: drift == 0,
        }
    }
}
