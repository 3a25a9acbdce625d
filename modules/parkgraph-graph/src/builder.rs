//! GraphBuilder: turns normalized spot documents into the parking graph.
//!
//! A rebuild always starts from an empty graph. Entity nodes are merged on
//! first sight and never overwritten; derived edges and district rollups are
//! computed afterwards by graph-wide passes.

use std::fmt;

use neo4rs::{query, Query};
use tracing::{info, warn};

use parkgraph_common::NormalizedDocument;

use crate::schema::{ensure_constraints, wipe};
use crate::GraphClient;

/// Documents written between progress log lines.
pub const GRAPH_BATCH_SIZE: usize = 100;

/// Spots closer than this many meters get a NEAR edge.
pub const NEAR_THRESHOLD_M: f64 = 50.0;

const NEAR_PASS: &str = "MATCH (a:Spot), (b:Spot)
     WHERE a <> b
       AND a.lat IS NOT NULL AND a.lon IS NOT NULL
       AND b.lat IS NOT NULL AND b.lon IS NOT NULL
     WITH a, b, point.distance(
            point({latitude: a.lat, longitude: a.lon}),
            point({latitude: b.lat, longitude: b.lon})
          ) AS dist
     WHERE dist < $threshold
     MERGE (a)-[r:NEAR]->(b)
     SET r.distance = dist";

const SAME_TYPE_PASS: &str = "MATCH (a:Spot)-[:OF_TYPE]->(:SpotType)<-[:OF_TYPE]-(b:Spot)
     WHERE a <> b
     MERGE (a)-[:SAME_TYPE]->(b)";

const COMPLEMENTARY_PASS: &str = "MATCH (a:Spot)-[:ON_STREET]->(:Street)<-[:ON_STREET]-(b:Spot)
     MATCH (a)-[:OF_TYPE]->(ta:SpotType), (b)-[:OF_TYPE]->(tb:SpotType)
     WHERE a <> b AND ta <> tb
     MERGE (a)-[:COMPLEMENTARY]->(b)";

const ROLLUP_PASS: &str = "MATCH (d:District)
     OPTIONAL MATCH (d)<-[:LOCATED_IN]-(s:Spot)
     WITH d, count(s) AS spots, sum(coalesce(s.places, 0)) AS places
     SET d.total_spots = spots, d.total_places = places";

/// Graph-wide passes run after every spot is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedPass {
    Near,
    SameType,
    Complementary,
    Rollup,
}

impl DerivedPass {
    pub const ALL: [DerivedPass; 4] = [
        DerivedPass::Near,
        DerivedPass::SameType,
        DerivedPass::Complementary,
        DerivedPass::Rollup,
    ];

    fn query(self) -> Query {
        match self {
            Self::Near => query(NEAR_PASS).param("threshold", NEAR_THRESHOLD_M),
            Self::SameType => query(SAME_TYPE_PASS),
            Self::Complementary => query(COMPLEMENTARY_PASS),
            Self::Rollup => query(ROLLUP_PASS),
        }
    }
}

impl fmt::Display for DerivedPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Near => "near",
            Self::SameType => "same_type",
            Self::Complementary => "complementary",
            Self::Rollup => "district_rollup",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub pass: DerivedPass,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub spots_written: u64,
    pub spots_failed: u64,
    pub passes: Vec<PassOutcome>,
}

impl RebuildStats {
    pub fn failed_passes(&self) -> Vec<DerivedPass> {
        self.passes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.pass)
            .collect()
    }
}

impl fmt::Display for RebuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} spots written, {} failed, {}/{} derived passes ok",
            self.spots_written,
            self.spots_failed,
            self.passes.iter().filter(|o| o.succeeded).count(),
            self.passes.len()
        )
    }
}

pub struct GraphBuilder {
    client: GraphClient,
}

impl GraphBuilder {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Replace the whole graph with one built from `docs`.
    ///
    /// Only the wipe and constraint steps are fatal. Individual spots and
    /// derived passes that fail are logged and counted.
    pub async fn rebuild(&self, docs: &[NormalizedDocument]) -> Result<RebuildStats, neo4rs::Error> {
        wipe(&self.client).await?;
        ensure_constraints(&self.client).await?;

        let mut stats = RebuildStats::default();
        let total = docs.len();
        let mut done = 0usize;

        for batch in docs.chunks(GRAPH_BATCH_SIZE) {
            for doc in batch {
                match self.client.graph.run(spot_query(doc)).await {
                    Ok(()) => stats.spots_written += 1,
                    Err(e) => {
                        warn!(spot_id = doc.id.as_str(), error = %e, "Failed to write spot");
                        stats.spots_failed += 1;
                    }
                }
            }
            done += batch.len();
            info!("Graph: {done}/{total} spots processed");
        }

        for pass in DerivedPass::ALL {
            let succeeded = match self.run_pass(pass).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%pass, error = %e, "Derived pass failed");
                    false
                }
            };
            stats.passes.push(PassOutcome { pass, succeeded });
        }

        info!(%stats, "Graph rebuild finished");
        Ok(stats)
    }

    /// Run one derived pass over the current graph. Every pass MERGEs or
    /// overwrites what it derives, so re-running one after a failure leaves
    /// the same graph as a clean rebuild.
    pub async fn run_pass(&self, pass: DerivedPass) -> Result<(), neo4rs::Error> {
        self.client.graph.run(pass.query()).await?;
        info!(%pass, "Derived pass complete");
        Ok(())
    }
}

/// Cypher for one spot. Clauses for absent attributes are left out entirely,
/// so a missing district never becomes a placeholder node.
fn spot_cypher(doc: &NormalizedDocument) -> String {
    let mut cypher = String::from(
        "MERGE (s:Spot {id: $id})
         ON CREATE SET s.places = $places, s.surface = $surface, s.signage = $signage,
                       s.survey_date = $survey_date, s.lat = $lat, s.lon = $lon",
    );

    if doc.district.is_some() {
        cypher.push_str(
            "
         MERGE (d:District {name: $district})
         ON CREATE SET d.number = $district_number
         MERGE (s)-[:LOCATED_IN]->(d)",
        );
    }
    if doc.regulation.is_some() {
        cypher.push_str(
            "
         MERGE (r:Regulation {name: $regulation})
         MERGE (s)-[:GOVERNED_BY]->(r)",
        );
    }
    if doc.spot_type.is_some() {
        cypher.push_str(
            "
         MERGE (t:SpotType {name: $spot_type})
         MERGE (s)-[:OF_TYPE]->(t)",
        );
    }
    if doc.zone.is_some() {
        cypher.push_str(
            "
         MERGE (z:Zone {name: $zone})
         MERGE (s)-[:IN_ZONE]->(z)",
        );
        if doc.district.is_some() {
            cypher.push_str("\n         MERGE (z)-[:BELONGS_TO]->(d)");
        }
    }
    if doc.street.is_some() {
        cypher.push_str(
            "
         MERGE (st:Street {name: $street})
         MERGE (s)-[:ON_STREET]->(st)",
        );
        if doc.district.is_some() {
            cypher.push_str("\n         MERGE (st)-[:CROSSES]->(d)");
        }
    }

    cypher
}

fn spot_query(doc: &NormalizedDocument) -> Query {
    let mut q = query(&spot_cypher(doc))
        .param("id", doc.id.as_str())
        .param("places", doc.place_count)
        .param("surface", doc.surface)
        .param("signage", doc.signage.clone())
        .param("survey_date", doc.survey_date.clone())
        .param("lat", doc.geo_point.map(|p| p.lat))
        .param("lon", doc.geo_point.map(|p| p.lon));

    if let Some(district) = doc.district {
        q = q
            .param("district", district.to_string())
            .param("district_number", i64::from(district.number()));
    }
    if let Some(regulation) = &doc.regulation {
        q = q.param("regulation", regulation.as_str());
    }
    if let Some(spot_type) = &doc.spot_type {
        q = q.param("spot_type", spot_type.as_str());
    }
    if let Some(zone) = &doc.zone {
        q = q.param("zone", zone.as_str());
    }
    if let Some(street) = &doc.street {
        q = q.param("street", street.as_str());
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parkgraph_common::District;

    fn full_doc() -> NormalizedDocument {
        let mut d = NormalizedDocument::new("s1", Utc::now());
        d.district = District::new(3);
        d.regulation = Some("PAYANT".into());
        d.spot_type = Some("Livraison".into());
        d.zone = Some("3B".into());
        d.street = Some("RUE DE BRETAGNE".into());
        d
    }

    #[test]
    fn full_document_writes_every_structural_edge() {
        let cypher = spot_cypher(&full_doc());
        for rel in [
            "LOCATED_IN",
            "GOVERNED_BY",
            "OF_TYPE",
            "IN_ZONE",
            "ON_STREET",
            "BELONGS_TO",
            "CROSSES",
        ] {
            assert!(cypher.contains(&format!(":{rel}]")), "missing {rel}");
        }
        assert!(cypher.contains("ON CREATE SET d.number"));
    }

    #[test]
    fn absent_district_creates_no_district_clauses() {
        let mut doc = full_doc();
        doc.district = None;
        let cypher = spot_cypher(&doc);

        assert!(!cypher.contains("District"));
        assert!(!cypher.contains("BELONGS_TO"));
        assert!(!cypher.contains("CROSSES"));
        assert!(cypher.contains(":IN_ZONE]"));
        assert!(cypher.contains(":ON_STREET]"));
    }

    #[test]
    fn bare_document_only_merges_the_spot() {
        let cypher = spot_cypher(&NormalizedDocument::new("bare", Utc::now()));
        assert!(cypher.starts_with("MERGE (s:Spot {id: $id})"));
        assert_eq!(cypher.matches("MERGE").count(), 1);
    }

    #[test]
    fn passes_run_in_fixed_order_with_rollup_last() {
        assert_eq!(DerivedPass::ALL.last(), Some(&DerivedPass::Rollup));
        assert!(NEAR_PASS.contains("dist < $threshold"));
    }

    #[test]
    fn stats_report_failed_passes() {
        let stats = RebuildStats {
            spots_written: 3,
            spots_failed: 1,
            passes: vec![
                PassOutcome { pass: DerivedPass::Near, succeeded: false },
                PassOutcome { pass: DerivedPass::SameType, succeeded: true },
            ],
        };
        assert_eq!(stats.failed_passes(), vec![DerivedPass::Near]);
        assert_eq!(stats.to_string(), "3 spots written, 1 failed, 1/2 derived passes ok");
    }
}
