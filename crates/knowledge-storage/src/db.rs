//! RocksDB wrapper for knowledge storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Atomic insert of a record together with the advanced id sequence
//! - Point reads, full scans and filtered scans in ascending id order

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, info};

use knowledge_types::{KnowledgeRecord, NewKnowledge};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_KNOWLEDGE, CF_META};
use crate::error::StorageError;
use crate::keys::{decode_sequence, encode_sequence, KnowledgeKey, NEXT_ID_KEY};
use crate::store::{KnowledgeQuery, KnowledgeStore};

/// Main storage interface for knowledge records
pub struct Storage {
    db: DB,
    /// Next id to assign. Held across the insert write so ids and the
    /// persisted sequence advance together.
    next_id: Mutex<u64>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening knowledge storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        let next_id = Self::load_next_id(&db)?;
        debug!(next_id = next_id, "Loaded id sequence");

        Ok(Self {
            db,
            next_id: Mutex::new(next_id),
        })
    }

    /// The next id is the larger of the persisted sequence and the highest
    /// key + 1, so ids of deleted records are never handed out again.
    fn load_next_id(db: &DB) -> Result<u64, StorageError> {
        let meta_cf = db
            .cf_handle(CF_META)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_META.to_string()))?;
        let persisted = match db.get_cf(meta_cf, NEXT_ID_KEY)? {
            Some(bytes) => decode_sequence(&bytes)?,
            None => 1,
        };

        let knowledge_cf = db
            .cf_handle(CF_KNOWLEDGE)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_KNOWLEDGE.to_string()))?;
        let mut iter = db.iterator_cf(knowledge_cf, IteratorMode::End);
        let from_keys = match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                KnowledgeKey::from_bytes(&key)?.id + 1
            }
            None => 1,
        };

        Ok(persisted.max(from_keys))
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Insert a record with an explicit creation time.
    ///
    /// Used for imports that carry their original timestamps.
    pub fn insert_with_timestamp(
        &self,
        entry: NewKnowledge,
        now: DateTime<Utc>,
    ) -> Result<KnowledgeRecord, StorageError> {
        let knowledge_cf = self.cf(CF_KNOWLEDGE)?;
        let meta_cf = self.cf(CF_META)?;

        let mut next_id = self.next_id.lock().map_err(|_| StorageError::LockPoisoned)?;
        let id = *next_id;
        let record = KnowledgeRecord::from_new(id, entry, now);

        let mut batch = WriteBatch::default();
        batch.put_cf(knowledge_cf, KnowledgeKey::new(id).to_bytes(), record.to_bytes()?);
        batch.put_cf(meta_cf, NEXT_ID_KEY, encode_sequence(id + 1));
        self.db.write(batch)?;

        // Only advance once the write is durable
        *next_id = id + 1;
        debug!(id = id, content_type = %record.content_type, "Stored knowledge record");
        Ok(record)
    }

    fn put_record(&self, record: &KnowledgeRecord) -> Result<(), StorageError> {
        let cf = self.cf(CF_KNOWLEDGE)?;
        self.db
            .put_cf(cf, KnowledgeKey::new(record.id).to_bytes(), record.to_bytes()?)?;
        Ok(())
    }

    /// Visit every record in ascending id order.
    fn scan<F>(&self, mut visit: F) -> Result<(), StorageError>
    where
        F: FnMut(KnowledgeRecord) -> bool,
    {
        let cf = self.cf(CF_KNOWLEDGE)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record = KnowledgeRecord::from_bytes(&value)?;
            if !visit(record) {
                break;
            }
        }
        Ok(())
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            self.db.flush_cf(self.cf(cf_name)?)?;
        }
        Ok(())
    }
}

impl KnowledgeStore for Storage {
    fn insert(&self, entry: NewKnowledge) -> Result<KnowledgeRecord, StorageError> {
        self.insert_with_timestamp(entry, Utc::now())
    }

    fn get(&self, id: u64) -> Result<Option<KnowledgeRecord>, StorageError> {
        let cf = self.cf(CF_KNOWLEDGE)?;
        match self.db.get_cf(cf, KnowledgeKey::new(id).to_bytes())? {
            Some(bytes) => Ok(Some(KnowledgeRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn update_embedding(
        &self,
        id: u64,
        embedding: Vec<f32>,
    ) -> Result<KnowledgeRecord, StorageError> {
        let mut record = self.get(id)?.ok_or(StorageError::NotFound(id))?;
        record.set_embedding(embedding, Utc::now());
        self.put_record(&record)?;
        debug!(id = id, "Backfilled embedding");
        Ok(record)
    }

    fn delete(&self, id: u64) -> Result<bool, StorageError> {
        if self.get(id)?.is_none() {
            return Ok(false);
        }
        let cf = self.cf(CF_KNOWLEDGE)?;
        self.db.delete_cf(cf, KnowledgeKey::new(id).to_bytes())?;
        debug!(id = id, "Deleted knowledge record");
        Ok(true)
    }

    fn for_each_record(
        &self,
        visit: &mut dyn FnMut(KnowledgeRecord) -> bool,
    ) -> Result<(), StorageError> {
        self.scan(visit)
    }

    fn query(&self, query: &KnowledgeQuery) -> Result<Vec<KnowledgeRecord>, StorageError> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let mut records = Vec::new();
        if limit == 0 {
            return Ok(records);
        }
        self.scan(|record| {
            if query.matches(&record) {
                records.push(record);
            }
            records.len() < limit
        })?;
        Ok(records)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let cf = self.cf(CF_KNOWLEDGE)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn count_by_content_type(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        let mut counts = BTreeMap::new();
        self.scan(|record| {
            *counts.entry(record.content_type).or_insert(0) += 1;
            true
        })?;
        Ok(counts)
    }

    fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut count = 0u64;
        self.scan(|record| {
            if record.created_at >= since {
                count += 1;
            }
            true
        })?;
        Ok(count)
    }
}
