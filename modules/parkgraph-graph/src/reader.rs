use neo4rs::query;
use serde::Serialize;

use parkgraph_common::GeoPoint;

use crate::GraphClient;

pub const DEFAULT_NEARBY_RADIUS_M: f64 = 100.0;
pub const NEARBY_LIMIT: i64 = 20;

/// A spot close to a point of interest, with its categorical context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbySpot {
    pub id: String,
    pub street: Option<String>,
    pub spot_type: Option<String>,
    pub regulation: Option<String>,
    pub places: Option<i64>,
    pub lat: f64,
    pub lon: f64,
    /// Meters from the query point.
    pub distance: f64,
}

/// Read-only queries over the parking graph.
#[derive(Clone)]
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Zone names attached to a district, sorted.
    pub async fn zones_for_district(&self, number: i64) -> Result<Vec<String>, neo4rs::Error> {
        let q = query(
            "MATCH (d:District {number: $number})<-[:BELONGS_TO]-(z:Zone)
             RETURN z.name AS zone
             ORDER BY zone",
        )
        .param("number", number);

        let mut zones = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Ok(zone) = row.get::<String>("zone") {
                zones.push(zone);
            }
        }
        Ok(zones)
    }

    /// Up to [`NEARBY_LIMIT`] spots strictly within `radius_m` of `origin`,
    /// nearest first. Missing categorical context comes back as `None`.
    pub async fn nearby_alternatives(
        &self,
        origin: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbySpot>, neo4rs::Error> {
        let q = query(
            "MATCH (s:Spot)
             WHERE s.lat IS NOT NULL AND s.lon IS NOT NULL
             WITH s, point.distance(
                    point({latitude: $lat, longitude: $lon}),
                    point({latitude: s.lat, longitude: s.lon})
                  ) AS distance
             WHERE distance < $radius
             OPTIONAL MATCH (s)-[:OF_TYPE]->(t:SpotType)
             OPTIONAL MATCH (s)-[:GOVERNED_BY]->(r:Regulation)
             OPTIONAL MATCH (s)-[:ON_STREET]->(st:Street)
             RETURN s.id AS id, st.name AS street, t.name AS spot_type,
                    r.name AS regulation, s.places AS places,
                    s.lat AS lat, s.lon AS lon, distance
             ORDER BY distance ASC, id ASC
             LIMIT $limit",
        )
        .param("lat", origin.lat)
        .param("lon", origin.lon)
        .param("radius", radius_m)
        .param("limit", NEARBY_LIMIT);

        let mut spots = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let Ok(id) = row.get::<String>("id") else {
                continue;
            };
            spots.push(NearbySpot {
                id,
                street: row.get("street").ok(),
                spot_type: row.get("spot_type").ok(),
                regulation: row.get("regulation").ok(),
                places: row.get("places").ok(),
                lat: row.get("lat").unwrap_or_default(),
                lon: row.get("lon").unwrap_or_default(),
                distance: row.get("distance").unwrap_or_default(),
            });
        }
        Ok(spots)
    }

    /// Number of nodes carrying `label`, or every node when `None`.
    pub async fn node_count(&self, label: Option<&str>) -> Result<i64, neo4rs::Error> {
        let cypher = match label {
            Some(label) => format!("MATCH (n:{label}) RETURN count(n) AS n"),
            None => "MATCH (n) RETURN count(n) AS n".to_string(),
        };
        self.scalar_count(&cypher).await
    }

    /// Number of relationships of `rel_type`, or every relationship when `None`.
    pub async fn edge_count(&self, rel_type: Option<&str>) -> Result<i64, neo4rs::Error> {
        let cypher = match rel_type {
            Some(rel) => format!("MATCH ()-[r:{rel}]->() RETURN count(r) AS n"),
            None => "MATCH ()-[r]->() RETURN count(r) AS n".to_string(),
        };
        self.scalar_count(&cypher).await
    }

    /// `(total_spots, total_places)` for a district, if it exists.
    pub async fn district_totals(&self, number: i64) -> Result<Option<(i64, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (d:District {number: $number})
             RETURN d.total_spots AS spots, d.total_places AS places",
        )
        .param("number", number);

        let mut stream = self.client.graph.execute(q).await?;
        Ok(match stream.next().await? {
            Some(row) => Some((
                row.get("spots").unwrap_or_default(),
                row.get("places").unwrap_or_default(),
            )),
            None => None,
        })
    }

    async fn scalar_count(&self, cypher: &str) -> Result<i64, neo4rs::Error> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        Ok(match stream.next().await? {
            Some(row) => row.get("n").unwrap_or(0),
            None => 0,
        })
    }
}
