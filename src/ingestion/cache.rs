//! Per-source metadata cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::types::Schema;

/// Metadata derived from the last successful parse of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    /// Every dataset the source holds. Empty for single-dataset sources.
    pub dataset_names: Vec<String>,
    /// Field types, for formats that carry explicit typing.
    pub schema: Option<Schema>,
}

/// Source identifier to [`CacheEntry`] store.
///
/// Last write wins. Entries are never evicted; they live as long as the cache.
#[derive(Debug, Default)]
pub struct DataSourceCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl DataSourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source_id)
            .cloned()
    }

    pub fn put(&self, source_id: impl Into<String>, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source_id.into(), entry);
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
