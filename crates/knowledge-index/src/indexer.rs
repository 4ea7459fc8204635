//! The knowledge index orchestrator.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use knowledge_embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use knowledge_storage::{KnowledgeStore, Storage};
use knowledge_types::record::embedding_text;
use knowledge_types::{KnowledgeRecord, NewKnowledge, Settings};
use knowledge_vector::{FlatIndex, VectorError, VectorIndex};

use crate::error::IndexError;
use crate::rebuild::{NoOpProgressCallback, ProgressCallback, RebuildProgress, RebuildResult};
use crate::settings::load_embedder;
use crate::stats::{IndexHealth, KnowledgeStats, RECENT_WINDOW_DAYS};

/// Results returned by `search_knowledge` when the caller has no preference.
pub const DEFAULT_TOP_K: usize = 5;

/// Results returned by `get_related_knowledge` when the caller has no preference.
pub const DEFAULT_RELATED_TOP_K: usize = 3;

/// Vector index plus the record id stored at each position.
struct IndexState {
    vectors: FlatIndex,
    ids: Vec<u64>,
}

impl IndexState {
    fn append(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        self.vectors.append(embedding)?;
        self.ids.push(id);
        Ok(())
    }

    fn reset(&mut self) {
        self.vectors.reset();
        self.ids.clear();
    }
}

/// Semantic index over the records of a [`KnowledgeStore`].
///
/// Construct once and share by `Arc`. The in-memory side starts empty; call
/// [`rebuild_index`](Self::rebuild_index) to load what the store already holds.
pub struct KnowledgeIndex {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn EmbeddingModel>,
    state: RwLock<IndexState>,
    recent_window_days: i64,
}

impl KnowledgeIndex {
    /// Create an empty index over `store`, embedding with `embedder`.
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, IndexError> {
        let dimension = embedder.dimension();
        if dimension == 0 {
            return Err(IndexError::AdapterUnavailable(format!(
                "model {} reports dimension 0",
                embedder.info().name
            )));
        }

        info!(model = %embedder.info().name, dim = dimension, "Knowledge index created");

        Ok(Self {
            store,
            embedder,
            state: RwLock::new(IndexState {
                vectors: FlatIndex::new(dimension),
                ids: Vec::new(),
            }),
            recent_window_days: RECENT_WINDOW_DAYS,
        })
    }

    /// Open the RocksDB store and embedding model named by `settings`.
    ///
    /// Runs a full rebuild before returning when `index.rebuild_on_start` is set.
    pub fn from_settings(settings: &Settings) -> Result<Self, IndexError> {
        settings.index.validate().map_err(IndexError::Config)?;

        let db_path = settings.expanded_db_path();
        let storage = Storage::open(&db_path).map_err(IndexError::StoreRead)?;
        let embedder = load_embedder(&settings.embedding, settings.expanded_cache_dir())?;

        let index = Self::new(Arc::new(storage), embedder)?
            .with_recent_window_days(settings.index.recent_window_days);

        if settings.index.rebuild_on_start {
            index.rebuild_index()?;
        }
        Ok(index)
    }

    /// Change the window used for `recent_additions`.
    pub fn with_recent_window_days(mut self, days: i64) -> Self {
        self.recent_window_days = days;
        self
    }

    /// Embedding dimension, fixed for the lifetime of the index.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Number of vectors in the in-memory index.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read_state()?.ids.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    /// Record id and vector at `position`, if the position exists.
    pub fn entry(&self, position: usize) -> Result<Option<(u64, Vec<f32>)>, IndexError> {
        let state = self.read_state()?;
        match state.ids.get(position) {
            Some(id) => Ok(Some((*id, state.vectors.vector(position)?.to_vec()))),
            None => Ok(None),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, IndexState>, IndexError> {
        self.state.read().map_err(|_| IndexError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, IndexState>, IndexError> {
        self.state.write().map_err(|_| IndexError::LockPoisoned)
    }

    /// Reject vectors the index cannot hold: wrong dimension, or any NaN or
    /// infinite component (which the store cannot encode either).
    fn check_embedding(&self, embedding: &Embedding) -> Result<(), IndexError> {
        let expected = self.dimension();
        if embedding.dimension() != expected {
            return Err(VectorError::DimensionMismatch {
                expected,
                actual: embedding.dimension(),
            }
            .into());
        }
        if !embedding.is_finite() {
            return Err(EmbeddingError::InvalidInput(
                "embedding contains NaN or infinite values".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Embedding for an entry: the caller-supplied vector if any, otherwise
    /// the model's embedding of `title + " " + content`.
    fn embed_entry(&self, entry: &NewKnowledge) -> Result<Embedding, IndexError> {
        let embedding = match &entry.embedding {
            Some(values) => Embedding::new(values.clone()),
            None => self.embedder.embed(&entry.embedding_text())?,
        };
        self.check_embedding(&embedding)?;
        Ok(embedding)
    }

    /// Persist an entry and append it to the index. Caller holds the write lock.
    fn insert_locked(
        &self,
        state: &mut IndexState,
        mut entry: NewKnowledge,
        embedding: &Embedding,
    ) -> Result<KnowledgeRecord, IndexError> {
        entry.embedding = Some(embedding.values.clone());
        let record = self.store.insert(entry).map_err(IndexError::StoreWrite)?;
        state.append(record.id, embedding)?;
        Ok(record)
    }

    /// Add a record to the store and the index.
    ///
    /// `tags` defaults to empty and `source` to `"manual"`. If the store write
    /// fails the index is left as it was.
    pub fn add_knowledge(
        &self,
        title: &str,
        content: &str,
        content_type: &str,
        tags: Option<Vec<String>>,
        source: Option<&str>,
    ) -> Result<KnowledgeRecord, IndexError> {
        let mut entry = NewKnowledge::new(title, content, content_type);
        if let Some(tags) = tags {
            entry = entry.with_tags(tags);
        }
        if let Some(source) = source {
            entry = entry.with_source(source);
        }
        self.add_entry(entry)
    }

    /// Add a prepared entry. A supplied embedding is normalized and used as is.
    pub fn add_entry(&self, entry: NewKnowledge) -> Result<KnowledgeRecord, IndexError> {
        let embedding = self.embed_entry(&entry)?;

        let mut state = self.write_state()?;
        let record = self.insert_locked(&mut state, entry, &embedding)?;
        let position = state.ids.len() - 1;
        drop(state);

        info!(
            id = record.id,
            position = position,
            content_type = %record.content_type,
            "Added knowledge"
        );
        Ok(record)
    }

    /// Add many entries in order under one write lock.
    ///
    /// Entries are embedded together first. Each insert is individually
    /// atomic: on a store failure the records added before it stay in place
    /// and the error is returned.
    pub fn add_knowledge_batch(
        &self,
        entries: Vec<NewKnowledge>,
    ) -> Result<Vec<KnowledgeRecord>, IndexError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let pending: Vec<String> = entries
            .iter()
            .filter(|e| e.embedding.is_none())
            .map(|e| e.embedding_text())
            .collect();
        let mut computed = self.embedder.embed_texts(&pending)?.into_iter();

        let mut embeddings = Vec::with_capacity(entries.len());
        for entry in &entries {
            let embedding = match &entry.embedding {
                Some(values) => Embedding::new(values.clone()),
                None => computed.next().ok_or_else(|| {
                    EmbeddingError::InvalidInput(
                        "model returned fewer embeddings than inputs".to_string(),
                    )
                })?,
            };
            self.check_embedding(&embedding)?;
            embeddings.push(embedding);
        }

        let mut state = self.write_state()?;
        let mut records = Vec::with_capacity(entries.len());
        for (entry, embedding) in entries.into_iter().zip(embeddings.iter()) {
            records.push(self.insert_locked(&mut state, entry, embedding)?);
        }
        drop(state);

        info!(count = records.len(), "Added knowledge batch");
        Ok(records)
    }

    /// Records most similar to `query`, best first.
    ///
    /// The `content_type` filter is applied after the top-k cut, so fewer than
    /// `top_k` results can come back even when more matching records exist.
    pub fn search_knowledge(
        &self,
        query: &str,
        top_k: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<(KnowledgeRecord, f32)>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query)?;
        self.check_embedding(&query_embedding)?;
        self.search_embedding(&query_embedding, top_k, content_type)
    }

    fn search_embedding(
        &self,
        query: &Embedding,
        top_k: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<(KnowledgeRecord, f32)>, IndexError> {
        let state = self.read_state()?;
        // Positions past the id list are stale and skipped
        let hits: Vec<(u64, f32)> = state
            .vectors
            .search(query, top_k)?
            .into_iter()
            .filter_map(|hit| state.ids.get(hit.position).map(|id| (*id, hit.score)))
            .collect();
        drop(state);

        let mut results = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let record = match self.store.get(id).map_err(IndexError::StoreRead)? {
                Some(record) => record,
                None => {
                    warn!(id = id, "Indexed record missing from store, skipping");
                    continue;
                }
            };
            if let Some(ct) = content_type {
                if record.content_type != ct {
                    continue;
                }
            }
            results.push((record, score));
        }

        debug!(top_k = top_k, returned = results.len(), "Knowledge search complete");
        Ok(results)
    }

    /// Records most similar to record `id`, excluding the record itself.
    ///
    /// Returns an empty list when `id` is not in the store.
    pub fn get_related_knowledge(
        &self,
        id: u64,
        top_k: usize,
    ) -> Result<Vec<(KnowledgeRecord, f32)>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let record = match self.store.get(id).map_err(IndexError::StoreRead)? {
            Some(record) => record,
            None => return Ok(Vec::new()),
        };

        let query = match record.embedding {
            Some(values) if values.len() == self.dimension() => Embedding::from_normalized(values),
            _ => self
                .embedder
                .embed(&embedding_text(&record.title, &record.content))?,
        };
        self.check_embedding(&query)?;

        let mut results = self.search_embedding(&query, top_k + 1, None)?;
        results.retain(|(r, _)| r.id != id);
        results.truncate(top_k);
        Ok(results)
    }

    /// Rebuild the in-memory index from the store.
    pub fn rebuild_index(&self) -> Result<RebuildResult, IndexError> {
        self.rebuild_index_with_progress(&NoOpProgressCallback)
    }

    /// Rebuild the in-memory index from the store, reporting progress.
    ///
    /// Records are streamed from the store and appended in ascending id
    /// order. A stored embedding of the current dimension is reused; anything
    /// else is embedded and written back. On error the index is partially
    /// rebuilt and should be rebuilt again.
    pub fn rebuild_index_with_progress(
        &self,
        callback: &dyn ProgressCallback,
    ) -> Result<RebuildResult, IndexError> {
        let start = Instant::now();

        let mut state = self.write_state()?;
        state.reset();
        info!(model = %self.embedder.info().name, "Rebuilding knowledge index");

        let mut progress = RebuildProgress::new();
        let mut failure = None;
        self.store
            .for_each_record(&mut |record| {
                match self.rebuild_record(&mut state, record, &mut progress) {
                    Ok(()) => {
                        if progress.at_interval() {
                            callback.on_progress(&progress);
                        }
                        true
                    }
                    Err(e) => {
                        failure = Some(e);
                        false
                    }
                }
            })
            .map_err(IndexError::StoreRead)?;
        drop(state);

        if let Some(e) = failure {
            warn!(processed = progress.total_processed, error = %e, "Rebuild stopped");
            return Err(e);
        }

        progress.mark_completed();
        callback.on_progress(&progress);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            processed = progress.total_processed,
            reused = progress.reused,
            embedded = progress.embedded,
            elapsed_ms = elapsed_ms,
            "Knowledge index rebuilt"
        );

        Ok(RebuildResult {
            progress,
            elapsed_ms,
        })
    }

    /// Append one stored record during a rebuild, embedding it if needed.
    fn rebuild_record(
        &self,
        state: &mut IndexState,
        record: KnowledgeRecord,
        progress: &mut RebuildProgress,
    ) -> Result<(), IndexError> {
        let dimension = self.dimension();
        let embedding = match record.embedding {
            Some(values) if values.len() == dimension => {
                progress.record_reused();
                Embedding::from_normalized(values)
            }
            stored => {
                if let Some(values) = stored {
                    warn!(
                        id = record.id,
                        stored = values.len(),
                        expected = dimension,
                        "Stored embedding has wrong dimension, re-embedding"
                    );
                }
                let embedding = self
                    .embedder
                    .embed(&embedding_text(&record.title, &record.content))?;
                self.check_embedding(&embedding)?;
                self.store
                    .update_embedding(record.id, embedding.values.clone())
                    .map_err(IndexError::StoreWrite)?;
                progress.record_embedded();
                embedding
            }
        };
        state.append(record.id, &embedding)?;
        Ok(())
    }

    /// Counts from the store and the in-memory index.
    pub fn get_knowledge_stats(&self) -> Result<KnowledgeStats, IndexError> {
        let index_size = self.len()? as u64;
        let total_entries = self.store.count().map_err(IndexError::StoreRead)?;
        let content_types = self
            .store
            .count_by_content_type()
            .map_err(IndexError::StoreRead)?;
        let since = Utc::now() - Duration::days(self.recent_window_days);
        let recent_additions = self
            .store
            .count_created_since(since)
            .map_err(IndexError::StoreRead)?;

        Ok(KnowledgeStats {
            total_entries,
            index_size,
            content_types,
            recent_additions,
            model_name: self.embedder.info().name.clone(),
            embedding_dimension: self.dimension(),
        })
    }

    /// Drift between the store and the in-memory index.
    pub fn health(&self) -> Result<IndexHealth, IndexError> {
        let index_size = self.len()? as u64;
        let total_entries = self.store.count().map_err(IndexError::StoreRead)?;
        let health = IndexHealth::new(total_entries, index_size);
        if !health.in_sync {
            warn!(drift = health.drift, "Knowledge index drifted from store");
        }
        Ok(health)
    }
}
