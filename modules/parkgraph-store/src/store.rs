//! DocumentStore: the searchable home of normalized parking documents.
//!
//! Two collections, `footprints` and `spots`, each wiped and reloaded
//! wholesale on every ETL run. Search, proximity and distinct-value reads only
//! ever target `spots`.

use async_trait::async_trait;
use tracing::info;

use parkgraph_common::{Collection, DistinctField, GeoPoint, NormalizedDocument, SearchFilters};

use crate::error::Result;

/// Upper bound on attribute-search results when the caller gives none.
pub const DEFAULT_SEARCH_LIMIT: usize = 500;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Delete every document in `collection`. Returns how many were removed.
    async fn clear(&self, collection: Collection) -> Result<u64>;

    /// Insert one batch. Returns the number of documents written.
    async fn insert_many(&self, collection: Collection, docs: &[NormalizedDocument])
        -> Result<u64>;

    /// Create the collections and their secondary indexes. Safe to call
    /// repeatedly.
    async fn create_indexes(&self) -> Result<()>;

    /// Conjunctive attribute search over spots, in insertion order.
    async fn search(&self, filters: &SearchFilters, limit: usize)
        -> Result<Vec<NormalizedDocument>>;

    /// Every spot that carries raw coordinates.
    async fn documents_with_coordinates(&self) -> Result<Vec<NormalizedDocument>>;

    /// Full scan of a collection, in insertion order.
    async fn all_documents(&self, collection: Collection) -> Result<Vec<NormalizedDocument>>;

    /// Sorted distinct non-null values of `field` across spots.
    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>>;

    async fn count(&self, collection: Collection) -> Result<u64>;

    /// Spots within `radius_m` meters of `origin` (inclusive).
    ///
    /// Scans every spot with coordinates; the geospatial index is not used.
    async fn proximity_search(
        &self,
        origin: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NormalizedDocument>> {
        let candidates = self.documents_with_coordinates().await?;
        Ok(filter_by_proximity(candidates, origin, radius_m))
    }

    /// Replace the contents of `collection` with `docs`, inserting in the
    /// collection's batch size.
    async fn load(&self, collection: Collection, docs: &[NormalizedDocument]) -> Result<u64> {
        let removed = self.clear(collection).await?;
        info!(%collection, removed, "Collection cleared");

        let total = docs.len();
        let mut inserted = 0u64;
        let mut done = 0usize;
        for batch in docs.chunks(collection.insert_batch_size()) {
            inserted += self.insert_many(collection, batch).await?;
            done += batch.len();
            info!(%collection, "Inserted {done}/{total}");
        }

        Ok(inserted)
    }

    async fn load_footprints(&self, docs: &[NormalizedDocument]) -> Result<u64> {
        self.load(Collection::Footprints, docs).await
    }

    async fn load_spots(&self, docs: &[NormalizedDocument]) -> Result<u64> {
        self.load(Collection::Spots, docs).await
    }
}

/// Keep documents whose raw coordinates lie within `radius_m` of `origin`.
pub fn filter_by_proximity(
    docs: Vec<NormalizedDocument>,
    origin: GeoPoint,
    radius_m: f64,
) -> Vec<NormalizedDocument> {
    docs.into_iter()
        .filter(|doc| {
            doc.geo_point
                .map(|p| origin.distance_to(&p) <= radius_m)
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDocumentStore;
    use chrono::Utc;
    use parkgraph_common::{District, PointGeometry};

    fn spot(id: &str, district: Option<i64>, geo: Option<(f64, f64)>) -> NormalizedDocument {
        let mut d = NormalizedDocument::new(id, Utc::now());
        d.district = district.and_then(District::new);
        d.geo_point = geo.map(|(lat, lon)| GeoPoint::new(lat, lon));
        d.location = d.geo_point.map(PointGeometry::from_point);
        d
    }

    fn ids(docs: &[NormalizedDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    fn three_spots() -> Vec<NormalizedDocument> {
        vec![
            spot("a", Some(1), Some((48.86, 2.35))),
            spot("b", Some(1), None),
            spot("c", Some(5), Some((48.87, 2.36))),
        ]
    }

    #[tokio::test]
    async fn district_search_ignores_geometry() {
        let store = MemoryDocumentStore::new();
        store.load_spots(&three_spots()).await.unwrap();

        let filters = SearchFilters { district: Some(1), ..Default::default() };
        let found = store.search(&filters, DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(ids(&found), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn proximity_keeps_only_nearby_located_spots() {
        let store = MemoryDocumentStore::new();
        store.load_spots(&three_spots()).await.unwrap();

        let found = store
            .proximity_search(GeoPoint::new(48.86, 2.35), 200.0)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["a"]);
    }

    #[tokio::test]
    async fn out_of_range_district_search_is_empty() {
        let store = MemoryDocumentStore::new();
        store.load_spots(&three_spots()).await.unwrap();

        let filters = SearchFilters { district: Some(21), ..Default::default() };
        assert!(store.search(&filters, DEFAULT_SEARCH_LIMIT).await.unwrap().is_empty());
    }

    #[test]
    fn proximity_boundary_is_inclusive() {
        let origin = GeoPoint::new(48.86, 2.35);
        let other = GeoPoint::new(48.861, 2.351);
        let d = origin.distance_to(&other);
        let docs = vec![
            spot("origin", None, Some((origin.lat, origin.lon))),
            spot("edge", None, Some((other.lat, other.lon))),
        ];

        assert_eq!(ids(&filter_by_proximity(docs.clone(), origin, d)), vec!["origin", "edge"]);
        assert_eq!(ids(&filter_by_proximity(docs.clone(), origin, d - 0.001)), vec!["origin"]);
        assert_eq!(ids(&filter_by_proximity(docs, origin, 0.0)), vec!["origin"]);
    }

    #[test]
    fn spot_just_past_the_radius_due_east_is_excluded() {
        let origin = GeoPoint::new(48.86, 2.35);
        let docs = vec![spot("east", None, Some((48.86, 2.35683)))];

        assert!(filter_by_proximity(docs.clone(), origin, 500.0).is_empty());
        assert_eq!(ids(&filter_by_proximity(docs, origin, 502.0)), vec!["east"]);
    }

    #[test]
    fn proximity_uses_raw_coordinates_outside_the_envelope() {
        let mut far = spot("far", None, None);
        far.geo_point = Some(GeoPoint::new(45.76, 4.83));
        let found = filter_by_proximity(vec![far], GeoPoint::new(45.76, 4.83), 10.0);
        assert_eq!(ids(&found), vec!["far"]);
    }

    #[tokio::test]
    async fn load_wipes_and_batches() {
        let store = MemoryDocumentStore::new();
        store.load_spots(&[spot("stale", None, None)]).await.unwrap();

        let docs: Vec<_> = (0..1_203).map(|n| spot(&format!("s{n}"), None, None)).collect();
        let inserted = store.load_spots(&docs).await.unwrap();

        assert_eq!(inserted, 1_203);
        assert_eq!(store.count(Collection::Spots).await.unwrap(), 1_203);
        assert_eq!(store.batch_sizes(Collection::Spots), vec![1, 500, 500, 203]);
    }

    #[tokio::test]
    async fn footprints_use_smaller_batches() {
        let store = MemoryDocumentStore::new();
        let docs: Vec<_> = (0..250).map(|n| spot(&format!("f{n}"), None, None)).collect();
        store.load_footprints(&docs).await.unwrap();

        assert_eq!(store.batch_sizes(Collection::Footprints), vec![100, 100, 50]);
        assert_eq!(store.count(Collection::Spots).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let store = MemoryDocumentStore::new();
        let docs: Vec<_> = (0..10).map(|n| spot(&format!("s{n}"), Some(4), None)).collect();
        store.load_spots(&docs).await.unwrap();

        let found = store.search(&SearchFilters::default(), 3).await.unwrap();
        assert_eq!(ids(&found), vec!["s0", "s1", "s2"]);
    }

    #[tokio::test]
    async fn distinct_values_reflect_current_contents() {
        let store = MemoryDocumentStore::new();
        let mut a = spot("a", Some(12), None);
        a.regulation = Some("PAYANT".into());
        let mut b = spot("b", Some(2), None);
        b.regulation = Some("GIG/GIC".into());
        let c = spot("c", Some(12), None);
        store.load_spots(&[a, b, c]).await.unwrap();

        assert_eq!(
            store.distinct_values(DistinctField::Regulation).await.unwrap(),
            vec!["GIG/GIC", "PAYANT"]
        );
        assert_eq!(store.distinct_values(DistinctField::District).await.unwrap(), vec!["2", "12"]);

        store.load_spots(&[]).await.unwrap();
        assert!(store.distinct_values(DistinctField::Regulation).await.unwrap().is_empty());
    }
}
