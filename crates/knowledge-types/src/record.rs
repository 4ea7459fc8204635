//! Knowledge record types.
//!
//! A knowledge record is a piece of text submitted by a user or an agent
//! (a thought, a decision, a code analysis...) together with the embedding
//! that makes it semantically searchable.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// Provenance assigned when the caller does not name one.
pub const DEFAULT_SOURCE: &str = "manual";

/// A durable knowledge entry.
///
/// The `id` is assigned by the store on insert and never changes. The only
/// mutation the index performs is backfilling `embedding` during a rebuild,
/// which advances `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Store-assigned identifier (ascending insertion order)
    pub id: u64,

    pub title: String,

    pub content: String,

    /// Free-form classification tag (e.g. "thought", "code_analysis")
    pub content_type: String,

    /// Tags in insertion order
    #[serde(default)]
    pub tags: Vec<String>,

    /// Serialized embedding of `title + " " + content`
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    /// Where this knowledge came from
    pub source: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    /// Build the stored record for a new entry.
    ///
    /// Timestamps are truncated to the millisecond precision they are stored at.
    pub fn from_new(id: u64, entry: NewKnowledge, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(3);
        Self {
            id,
            title: entry.title,
            content: entry.content,
            content_type: entry.content_type,
            tags: entry.tags,
            embedding: entry.embedding,
            source: entry.source,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the embedding and advance `updated_at` to `now`.
    pub fn set_embedding(&mut self, embedding: Vec<f32>, now: DateTime<Utc>) {
        self.embedding = Some(embedding);
        self.updated_at = now.trunc_subsecs(3);
    }

    /// The text that gets embedded for this record.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.content)
    }

    /// Tag lookup with set semantics.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether an embedding has been stored for this record.
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Serialize to JSON bytes.
    ///
    /// JSON has no encoding for NaN or infinity, so an embedding holding
    /// either is rejected rather than written as `null`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KnowledgeError> {
        if let Some(embedding) = &self.embedding {
            if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
                return Err(KnowledgeError::InvalidInput(format!(
                    "record {} embedding has non-finite value at index {}",
                    self.id, pos
                )));
            }
        }
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KnowledgeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Insert payload for a knowledge record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewKnowledge {
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub tags: Vec<String>,
    pub source: String,
    pub embedding: Option<Vec<f32>>,
}

impl NewKnowledge {
    /// Create a payload with no tags and the default source.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            content_type: content_type.into(),
            tags: Vec::new(),
            source: DEFAULT_SOURCE.to_string(),
            embedding: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The text that gets embedded for this payload.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.content)
    }
}

/// Title and content joined by a single space.
pub fn embedding_text(title: &str, content: &str) -> String {
    format!("{} {}", title, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_knowledge_defaults() {
        let entry = NewKnowledge::new("Title", "Body", "thought");
        assert_eq!(entry.source, DEFAULT_SOURCE);
        assert!(entry.tags.is_empty());
        assert!(entry.embedding.is_none());
        assert_eq!(entry.embedding_text(), "Title Body");
    }

    #[test]
    fn test_record_serialization() {
        let entry = NewKnowledge::new("Cache", "Evict on write", "decision")
            .with_tags(vec!["ops".to_string(), "cache".to_string()])
            .with_source("agent:planner")
            .with_embedding(vec![0.6, 0.8]);
        let record = KnowledgeRecord::from_new(7, entry, Utc::now());

        let bytes = record.to_bytes().unwrap();
        let decoded = KnowledgeRecord::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.tags, vec!["ops", "cache"]);
        assert_eq!(decoded.source, "agent:planner");
        assert_eq!(decoded.embedding, Some(vec![0.6, 0.8]));
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_non_finite_embedding_not_encoded() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let entry = NewKnowledge::new("t", "c", "x").with_embedding(vec![bad, 0.5]);
            let record = KnowledgeRecord::from_new(9, entry, Utc::now());
            assert!(matches!(
                record.to_bytes(),
                Err(KnowledgeError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_null_embedding_component_is_decode_error() {
        let json = r#"{"id":3,"title":"t","content":"c","content_type":"x","embedding":[null,0.5],"source":"manual","created_at":0,"updated_at":0}"#;
        assert!(matches!(
            KnowledgeRecord::from_bytes(json.as_bytes()),
            Err(KnowledgeError::Serialization(_))
        ));
    }

    #[test]
    fn test_set_embedding_advances_updated_at() {
        let created = Utc::now() - chrono::Duration::minutes(5);
        let mut record = KnowledgeRecord::from_new(1, NewKnowledge::new("t", "c", "x"), created);
        record.set_embedding(vec![1.0], Utc::now());
        assert!(record.updated_at > record.created_at);
        assert_eq!(record.embedding, Some(vec![1.0]));
    }

    #[test]
    fn test_has_tag_ignores_duplicates() {
        let entry = NewKnowledge::new("t", "c", "thought")
            .with_tags(vec!["a".to_string(), "a".to_string(), "b".to_string()]);
        let record = KnowledgeRecord::from_new(1, entry, Utc::now());
        assert!(record.has_tag("a"));
        assert!(record.has_tag("b"));
        assert!(!record.has_tag("c"));
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{"id":3,"title":"t","content":"c","content_type":"x","source":"manual","created_at":0,"updated_at":0}"#;
        let record = KnowledgeRecord::from_bytes(json.as_bytes()).unwrap();
        assert!(record.tags.is_empty());
        assert!(!record.has_embedding());
    }
}
