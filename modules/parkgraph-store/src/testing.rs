// In-memory DocumentStore for tests that shouldn't need Postgres.
//
// Search and distinct-value semantics mirror the SQL in postgres.rs;
// proximity goes through the shared trait default.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use parkgraph_common::{Collection, DistinctField, NormalizedDocument, SearchFilters};

use crate::error::Result;
use crate::store::DocumentStore;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<Collection, Vec<NormalizedDocument>>>,
    batches: Mutex<HashMap<Collection, Vec<usize>>>,
    index_calls: Mutex<usize>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `docs` in the spots collection.
    pub fn with_spots(docs: Vec<NormalizedDocument>) -> Self {
        let store = Self::new();
        store
            .collections
            .lock()
            .unwrap()
            .insert(Collection::Spots, docs);
        store
    }

    /// Sizes of every `insert_many` call made against `collection`.
    pub fn batch_sizes(&self, collection: Collection) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn index_calls(&self) -> usize {
        *self.index_calls.lock().unwrap()
    }

    fn snapshot(&self, collection: Collection) -> Vec<NormalizedDocument> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn clear(&self, collection: Collection) -> Result<u64> {
        let removed = self
            .collections
            .lock()
            .unwrap()
            .remove(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0);
        Ok(removed as u64)
    }

    async fn insert_many(
        &self,
        collection: Collection,
        docs: &[NormalizedDocument],
    ) -> Result<u64> {
        self.batches
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(docs.len());
        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .extend_from_slice(docs);
        Ok(docs.len() as u64)
    }

    async fn create_indexes(&self) -> Result<()> {
        *self.index_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<NormalizedDocument>> {
        Ok(self
            .snapshot(Collection::Spots)
            .into_iter()
            .filter(|doc| filters.matches(doc))
            .take(limit)
            .collect())
    }

    async fn documents_with_coordinates(&self) -> Result<Vec<NormalizedDocument>> {
        Ok(self
            .snapshot(Collection::Spots)
            .into_iter()
            .filter(|doc| doc.geo_point.is_some())
            .collect())
    }

    async fn all_documents(&self, collection: Collection) -> Result<Vec<NormalizedDocument>> {
        Ok(self.snapshot(collection))
    }

    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>> {
        let docs = self.snapshot(Collection::Spots);
        let values = match field {
            DistinctField::District => docs
                .iter()
                .filter_map(|d| d.district)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|d| d.to_string())
                .collect(),
            _ => docs
                .iter()
                .filter_map(|d| match field {
                    DistinctField::Regulation => d.regulation.clone(),
                    DistinctField::SpotType => d.spot_type.clone(),
                    DistinctField::Zone => d.zone.clone(),
                    DistinctField::Street => d.street.clone(),
                    DistinctField::District => None,
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };
        Ok(values)
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        Ok(self.snapshot(collection).len() as u64)
    }
}
