//! Key encoding and decoding for the storage layer.
//!
//! Record key format: `kn:{id:020}`. Zero-padding to 20 digits (the width of
//! u64::MAX) makes lexicographic key order equal numeric id order, so a
//! forward scan of the column family visits records in ascending id.

use crate::error::StorageError;

const KNOWLEDGE_PREFIX: &str = "kn";

/// Key under which the next id to assign is stored in the meta column family
pub const NEXT_ID_KEY: &[u8] = b"meta:next_id";

/// Key for a knowledge record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KnowledgeKey {
    pub id: u64,
}

impl KnowledgeKey {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}:{:020}", KNOWLEDGE_PREFIX, self.id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| StorageError::Key(format!("Invalid knowledge key format: {}", s)))?;
        if prefix != KNOWLEDGE_PREFIX {
            return Err(StorageError::Key(format!("Invalid knowledge key prefix: {}", s)));
        }

        let id: u64 = id
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid id: {}", e)))?;
        Ok(Self { id })
    }
}

/// Encode the stored id sequence value.
pub fn encode_sequence(next_id: u64) -> [u8; 8] {
    next_id.to_be_bytes()
}

/// Decode the stored id sequence value.
pub fn decode_sequence(bytes: &[u8]) -> Result<u64, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Key(format!("Invalid sequence length: {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
