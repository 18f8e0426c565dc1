//! In-memory staging cache
//!
//! Holds every staged dataset until it is committed or discarded. Owned by
//! the router and only mutated inside a single dispatch, so it carries no
//! locking of its own.

use indexmap::IndexMap;

use crate::dataset::StagedDataset;
use crate::error::{StageError, StageResult};

#[derive(Debug, Default)]
pub struct StagingCache {
    datasets: IndexMap<String, StagedDataset>,
}

impl StagingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a dataset under its id, replacing any previous entry
    pub fn put(&mut self, dataset: StagedDataset) {
        tracing::debug!(id = %dataset.id, rows = dataset.row_count(), "dataset staged");
        self.datasets.insert(dataset.id.clone(), dataset);
    }

    pub fn get(&self, id: &str) -> StageResult<&StagedDataset> {
        self.datasets
            .get(id)
            .ok_or_else(|| StageError::DatasetMissing(id.to_string()))
    }

    /// Remove a dataset; returns whether it was present
    pub fn evict(&mut self, id: &str) -> bool {
        let existed = self.datasets.shift_remove(id).is_some();
        if existed {
            tracing::debug!(id, "dataset evicted");
        }
        existed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    /// Whether an id is staged, ignoring ASCII case like the catalog does
    pub fn contains_ignore_case(&self, id: &str) -> bool {
        self.datasets.keys().any(|key| key.eq_ignore_ascii_case(id))
    }

    /// Whether a dataset other than `id` is staged under `name`, ignoring ASCII case
    pub fn name_taken_by_other(&self, name: &str, id: &str) -> bool {
        self.datasets
            .keys()
            .any(|key| key != id && key.eq_ignore_ascii_case(name))
    }

    /// Staged datasets in staging order
    pub fn list(&self) -> impl Iterator<Item = &StagedDataset> {
        self.datasets.values()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset(id: &str) -> StagedDataset {
        StagedDataset {
            id: id.into(),
            title: id.into(),
            headers: Vec::new(),
            rows: Vec::new(),
            created_at: 0,
        }
    }

    #[test]
    fn put_get_evict() {
        let mut cache = StagingCache::new();
        cache.put(dataset("a"));
        assert!(cache.contains("a"));
        assert!(cache.contains_ignore_case("A"));
        assert!(!cache.contains("A"));
        assert_eq!(cache.get("a").unwrap().id, "a");

        assert!(cache.evict("a"));
        assert!(!cache.evict("a"));
        assert!(matches!(cache.get("a"), Err(StageError::DatasetMissing(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn name_taken_by_other_ignores_the_dataset_itself() {
        let mut cache = StagingCache::new();
        cache.put(dataset("sales"));
        cache.put(dataset("sales_1"));
        assert!(cache.name_taken_by_other("SALES_1", "sales"));
        assert!(!cache.name_taken_by_other("sales", "sales"));
        assert!(!cache.name_taken_by_other("archive", "sales"));
    }

    #[test]
    fn list_keeps_staging_order() {
        let mut cache = StagingCache::new();
        for id in ["c", "a", "b"] {
            cache.put(dataset(id));
        }
        cache.evict("a");
        let ids: Vec<&str> = cache.list().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(cache.len(), 2);
    }
}
