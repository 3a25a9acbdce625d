// Seams between QueryService and its remote dependencies.
//
// Geocoder turns a free-text address into coordinates; GraphLookup covers the
// two read queries the service issues against the graph. Both have in-memory
// doubles in testing.rs so the service runs without network or Docker.

use anyhow::Result;
use async_trait::async_trait;

use parkgraph_common::GeoPoint;
use parkgraph_graph::{GraphReader, NearbySpot};

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for `address`, or `None` when nothing matched.
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>>;
}

#[async_trait]
pub trait GraphLookup: Send + Sync {
    async fn zones_for_district(&self, number: i64) -> Result<Vec<String>>;

    async fn nearby_alternatives(&self, origin: GeoPoint, radius_m: f64)
        -> Result<Vec<NearbySpot>>;
}

#[async_trait]
impl GraphLookup for GraphReader {
    async fn zones_for_district(&self, number: i64) -> Result<Vec<String>> {
        Ok(GraphReader::zones_for_district(self, number).await?)
    }

    async fn nearby_alternatives(
        &self,
        origin: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbySpot>> {
        Ok(GraphReader::nearby_alternatives(self, origin, radius_m).await?)
    }
}
