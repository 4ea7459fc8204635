//! Durable store interface consumed by the knowledge index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use knowledge_types::{KnowledgeRecord, NewKnowledge};

use crate::error::StorageError;

/// Filter over knowledge records. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeQuery {
    pub content_type: Option<String>,
    pub source: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub created_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl KnowledgeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn created_between(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record passes every set filter (limit aside).
    pub fn matches(&self, record: &KnowledgeRecord) -> bool {
        if let Some(ct) = &self.content_type {
            if &record.content_type != ct {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &record.source != source {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if record.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if record.created_at >= before {
                return false;
            }
        }
        true
    }
}

/// Source of truth for knowledge records.
///
/// Ids are assigned by the store, unique and ascending. Bulk reads return
/// records in ascending id order.
pub trait KnowledgeStore: Send + Sync {
    /// Persist a new record and return it with its id and timestamps.
    fn insert(&self, entry: NewKnowledge) -> Result<KnowledgeRecord, StorageError>;

    fn get(&self, id: u64) -> Result<Option<KnowledgeRecord>, StorageError>;

    /// Replace the stored embedding and advance `updated_at`.
    fn update_embedding(
        &self,
        id: u64,
        embedding: Vec<f32>,
    ) -> Result<KnowledgeRecord, StorageError>;

    /// Remove a record. Returns false if it did not exist.
    fn delete(&self, id: u64) -> Result<bool, StorageError>;

    /// Visit every record in ascending id order, one at a time.
    ///
    /// Stops early when `visit` returns false.
    fn for_each_record(
        &self,
        visit: &mut dyn FnMut(KnowledgeRecord) -> bool,
    ) -> Result<(), StorageError>;

    /// Every record, ascending id.
    fn iter_all(&self) -> Result<Vec<KnowledgeRecord>, StorageError> {
        let mut records = Vec::new();
        self.for_each_record(&mut |record| {
            records.push(record);
            true
        })?;
        Ok(records)
    }

    /// Records matching `query`, ascending id.
    fn query(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeRecord>, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;

    fn count_by_content_type(&self) -> Result<BTreeMap<String, u64>, StorageError>;

    fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(content_type: &str, source: &str, created_at: DateTime<Utc>) -> KnowledgeRecord {
        let entry = NewKnowledge::new("t", "c", content_type).with_source(source);
        KnowledgeRecord::from_new(1, entry, created_at)
    }

    #[test]
    fn test_empty_query_matches_all() {
        let r = record("thought", "manual", Utc::now());
        assert!(KnowledgeQuery::new().matches(&r));
    }

    #[test]
    fn test_query_filters() {
        let now = Utc::now();
        let r = record("thought", "journal", now);

        assert!(KnowledgeQuery::new().content_type("thought").matches(&r));
        assert!(!KnowledgeQuery::new().content_type("decision").matches(&r));
        assert!(KnowledgeQuery::new().source("journal").matches(&r));
        assert!(!KnowledgeQuery::new().source("manual").matches(&r));

        let window = KnowledgeQuery::new().created_between(Some(now), Some(now + Duration::seconds(1)));
        assert!(window.matches(&r));
        let before_only = KnowledgeQuery::new().created_between(None, Some(now));
        assert!(!before_only.matches(&r));
    }
}
