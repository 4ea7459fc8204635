//! Shared fixtures for knowledge index integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use knowledge_embeddings::{Embedding, EmbeddingError, EmbeddingModel, HashingEmbedder, ModelInfo};
use knowledge_index::KnowledgeIndex;
use knowledge_storage::{KnowledgeQuery, KnowledgeStore, Storage, StorageError};
use knowledge_types::{KnowledgeRecord, NewKnowledge};

pub const DIM: usize = 384;

/// Temp RocksDB store plus the embedder the index was built with.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub embedder: Arc<CountingEmbedder>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));
        let embedder = Arc::new(CountingEmbedder::hashing(DIM));
        Self {
            _temp_dir: temp_dir,
            storage,
            embedder,
        }
    }

    /// A fresh index over the harness store, sharing the counting embedder.
    pub fn index(&self) -> KnowledgeIndex {
        KnowledgeIndex::new(self.storage.clone(), self.embedder.clone())
            .expect("Failed to create index")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps an embedder and counts `embed` calls.
pub struct CountingEmbedder {
    inner: Box<dyn EmbeddingModel>,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(inner: Box<dyn EmbeddingModel>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hashing(dimension: usize) -> Self {
        Self::new(Box::new(HashingEmbedder::new(dimension).expect("hashing embedder")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

impl EmbeddingModel for CountingEmbedder {
    fn info(&self) -> &ModelInfo {
        self.inner.info()
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

/// Returns a fixed vector per exact input text.
pub struct FixedEmbedder {
    info: ModelInfo,
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize, vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            info: ModelInfo {
                name: "fixed".to_string(),
                dimension,
                max_sequence_length: usize::MAX,
            },
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl EmbeddingModel for FixedEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.vectors
            .get(text)
            .map(|v| Embedding::new(v.clone()))
            .ok_or_else(|| EmbeddingError::InvalidInput(format!("no vector for {:?}", text)))
    }
}

/// Delegates to a real store but can be told to fail inserts, record reads
/// (`get` and scans) or embedding write-backs. Counts never fail.
pub struct FailingStore {
    inner: Arc<Storage>,
    fail_inserts: AtomicBool,
    /// Fail only once this many inserts have succeeded
    fail_after: AtomicUsize,
    fail_reads: AtomicBool,
    fail_updates: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<Storage>) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_after: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Let `count` more inserts succeed, then fail the rest.
    pub fn fail_inserts_after(&self, count: usize) {
        self.fail_after.store(count, Ordering::SeqCst);
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Key("injected read failure".to_string()));
        }
        Ok(())
    }
}

impl KnowledgeStore for FailingStore {
    fn insert(&self, entry: NewKnowledge) -> Result<KnowledgeRecord, StorageError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            let remaining = self.fail_after.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(StorageError::Key("injected insert failure".to_string()));
            }
            self.fail_after.store(remaining - 1, Ordering::SeqCst);
        }
        self.inner.insert(entry)
    }

    fn get(&self, id: u64) -> Result<Option<KnowledgeRecord>, StorageError> {
        self.check_reads()?;
        self.inner.get(id)
    }

    fn update_embedding(
        &self,
        id: u64,
        embedding: Vec<f32>,
    ) -> Result<KnowledgeRecord, StorageError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Key("injected update failure".to_string()));
        }
        self.inner.update_embedding(id, embedding)
    }

    fn delete(&self, id: u64) -> Result<bool, StorageError> {
        self.inner.delete(id)
    }

    fn for_each_record(
        &self,
        visit: &mut dyn FnMut(KnowledgeRecord) -> bool,
    ) -> Result<(), StorageError> {
        self.check_reads()?;
        self.inner.for_each_record(visit)
    }

    fn query(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeRecord>, StorageError> {
        self.check_reads()?;
        self.inner.query(query)
    }

    fn count(&self) -> Result<u64, StorageError> {
        self.inner.count()
    }

    fn count_by_content_type(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        self.inner.count_by_content_type()
    }

    fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, StorageError> {
        self.inner.count_created_since(since)
    }
}

/// Titles of search results, in rank order.
pub fn titles(results: &[(KnowledgeRecord, f32)]) -> Vec<&str> {
    results.iter().map(|(r, _)| r.title.as_str()).collect()
}
