//! Column family definitions for RocksDB.
//!
//! - knowledge: id -> JSON knowledge record (default compaction, Zstd)
//! - meta: store bookkeeping such as the next id to assign

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for knowledge records
pub const CF_KNOWLEDGE: &str = "knowledge";

/// Column family name for store metadata
pub const CF_META: &str = "meta";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_KNOWLEDGE, CF_META];

/// Records carry text plus a float vector; compress them
fn knowledge_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_KNOWLEDGE, knowledge_options()),
        ColumnFamilyDescriptor::new(CF_META, Options::default()),
    ]
}
