#![cfg(feature = "test-utils")]

// Graph rebuild integration tests against a real Neo4j.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p parkgraph-graph --features test-utils --test rebuild_test

use chrono::Utc;
use neo4rs::query;

use parkgraph_common::{District, GeoPoint, NormalizedDocument};
use parkgraph_graph::{DerivedPass, GraphBuilder, GraphClient, GraphReader};

async fn setup() -> (impl std::any::Any, GraphClient) {
    parkgraph_graph::testutil::neo4j_container().await
}

fn spot(
    id: &str,
    district: Option<i64>,
    spot_type: Option<&str>,
    street: Option<&str>,
    geo: Option<(f64, f64)>,
) -> NormalizedDocument {
    let mut d = NormalizedDocument::new(id, Utc::now());
    d.district = district.and_then(District::new);
    d.spot_type = spot_type.map(str::to_string);
    d.street = street.map(str::to_string);
    d.geo_point = geo.map(|(lat, lon)| GeoPoint::new(lat, lon));
    d
}

fn sample() -> Vec<NormalizedDocument> {
    let mut a = spot("a", Some(3), Some("Payant"), Some("RUE DE BRETAGNE"), Some((48.8630, 2.3620)));
    a.zone = Some("3B".into());
    a.regulation = Some("PAYANT MIXTE".into());
    a.place_count = Some(4);
    let mut b = spot("b", Some(3), Some("Livraison"), Some("RUE DE BRETAGNE"), Some((48.8631, 2.3621)));
    b.zone = Some("3A".into());
    b.place_count = Some(2);
    let mut c = spot("c", Some(11), Some("Payant"), Some("BOULEVARD VOLTAIRE"), Some((48.8600, 2.3800)));
    c.zone = Some("11A".into());
    vec![a, b, c]
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    let first = builder.rebuild(&sample()).await.unwrap();
    assert_eq!(first.spots_written, 3);
    assert!(first.failed_passes().is_empty());
    let nodes = reader.node_count(None).await.unwrap();
    let edges = reader.edge_count(None).await.unwrap();

    builder.rebuild(&sample()).await.unwrap();
    assert_eq!(reader.node_count(None).await.unwrap(), nodes);
    assert_eq!(reader.edge_count(None).await.unwrap(), edges);

    // 3 spots, 2 districts, 2 types, 2 streets, 3 zones, 1 regulation
    assert_eq!(nodes, 13);
}

#[tokio::test]
async fn complementary_edges_are_one_per_ordered_pair() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    let docs = vec![
        spot("x", Some(1), Some("Payant"), Some("RUE DE RIVOLI"), None),
        spot("y", Some(1), Some("Livraison"), Some("RUE DE RIVOLI"), None),
    ];
    builder.rebuild(&docs).await.unwrap();

    assert_eq!(reader.edge_count(Some("COMPLEMENTARY")).await.unwrap(), 2);
    assert_eq!(reader.edge_count(Some("SAME_TYPE")).await.unwrap(), 0);
    assert_eq!(reader.edge_count(Some("NEAR")).await.unwrap(), 0);
}

#[tokio::test]
async fn derived_edges_follow_type_and_distance() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    builder.rebuild(&sample()).await.unwrap();

    // a and c share a type; b is ~14 m from a.
    assert_eq!(reader.edge_count(Some("SAME_TYPE")).await.unwrap(), 2);
    assert_eq!(reader.edge_count(Some("NEAR")).await.unwrap(), 2);
    assert_eq!(reader.edge_count(Some("COMPLEMENTARY")).await.unwrap(), 2);
}

#[tokio::test]
async fn absent_attributes_create_no_placeholders() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    builder
        .rebuild(&[spot("lonely", None, None, Some("RUE X"), None)])
        .await
        .unwrap();

    assert_eq!(reader.node_count(Some("Spot")).await.unwrap(), 1);
    assert_eq!(reader.node_count(Some("District")).await.unwrap(), 0);
    assert_eq!(reader.node_count(Some("SpotType")).await.unwrap(), 0);
    assert_eq!(reader.edge_count(Some("ON_STREET")).await.unwrap(), 1);
    assert_eq!(reader.edge_count(Some("CROSSES")).await.unwrap(), 0);
}

#[tokio::test]
async fn zones_and_rollups_are_queryable() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    builder.rebuild(&sample()).await.unwrap();

    assert_eq!(reader.zones_for_district(3).await.unwrap(), vec!["3A", "3B"]);
    assert_eq!(reader.zones_for_district(11).await.unwrap(), vec!["11A"]);
    assert!(reader.zones_for_district(20).await.unwrap().is_empty());

    assert_eq!(reader.district_totals(3).await.unwrap(), Some((2, 6)));
    assert_eq!(reader.district_totals(11).await.unwrap(), Some((1, 0)));
    assert_eq!(reader.district_totals(20).await.unwrap(), None);
}

#[tokio::test]
async fn nearby_alternatives_are_sorted_and_strict() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    builder.rebuild(&sample()).await.unwrap();

    let near = reader
        .nearby_alternatives(GeoPoint::new(48.8630, 2.3620), 100.0)
        .await
        .unwrap();
    let ids: Vec<_> = near.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(near[0].distance, 0.0);
    assert_eq!(near[0].regulation.as_deref(), Some("PAYANT MIXTE"));
    assert_eq!(near[1].regulation, None);
    assert_eq!(near[1].street.as_deref(), Some("RUE DE BRETAGNE"));

    // Radius equal to the exact distance excludes the spot.
    let exact = near[1].distance;
    let strict = reader
        .nearby_alternatives(GeoPoint::new(48.8630, 2.3620), exact)
        .await
        .unwrap();
    assert_eq!(strict.len(), 1);
}

async fn derived_edge_counts(reader: &GraphReader) -> [i64; 3] {
    [
        reader.edge_count(Some("NEAR")).await.unwrap(),
        reader.edge_count(Some("SAME_TYPE")).await.unwrap(),
        reader.edge_count(Some("COMPLEMENTARY")).await.unwrap(),
    ]
}

#[tokio::test]
async fn rerunning_a_single_pass_is_stable() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client);

    builder.rebuild(&sample()).await.unwrap();
    let edges = derived_edge_counts(&reader).await;
    assert_eq!(edges, [2, 2, 2]);

    for pass in DerivedPass::ALL {
        builder.run_pass(pass).await.unwrap();
        assert_eq!(derived_edge_counts(&reader).await, edges, "after re-running {pass}");
    }
    assert_eq!(reader.district_totals(3).await.unwrap(), Some((2, 6)));
}

#[tokio::test]
async fn failed_spot_write_is_skipped() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client.clone());

    // Survives the wipe; the second spot at lat 48.86 violates it.
    client
        .inner()
        .run(query(
            "CREATE CONSTRAINT spot_lat_unique IF NOT EXISTS FOR (n:Spot) REQUIRE n.lat IS UNIQUE",
        ))
        .await
        .unwrap();

    let mut docs = sample();
    docs.push(spot("d", Some(11), Some("Payant"), Some("BOULEVARD VOLTAIRE"), Some((48.8600, 2.3810))));

    let stats = builder.rebuild(&docs).await.unwrap();
    assert_eq!(stats.spots_written, 3);
    assert_eq!(stats.spots_failed, 1);
    assert!(stats.failed_passes().is_empty());

    assert_eq!(reader.node_count(Some("Spot")).await.unwrap(), 3);
    assert_eq!(derived_edge_counts(&reader).await, [2, 2, 2]);
    assert_eq!(reader.district_totals(11).await.unwrap(), Some((1, 0)));
}

#[tokio::test]
async fn failed_pass_does_not_block_the_others_and_can_be_retried() {
    let (_container, client) = setup().await;
    let builder = GraphBuilder::new(client.clone());
    let reader = GraphReader::new(client.clone());

    // Two districts with one spot each collide on total_spots.
    client
        .inner()
        .run(query(
            "CREATE CONSTRAINT district_total_unique IF NOT EXISTS \
             FOR (n:District) REQUIRE n.total_spots IS UNIQUE",
        ))
        .await
        .unwrap();

    let mut x = spot("x", Some(1), Some("Payant"), Some("RUE DE RIVOLI"), Some((48.8600, 2.3500)));
    x.place_count = Some(3);
    let y = spot("y", Some(2), Some("Payant"), Some("RUE DE RIVOLI"), Some((48.8601, 2.3501)));

    let stats = builder.rebuild(&[x, y]).await.unwrap();
    assert_eq!(stats.spots_written, 2);
    assert_eq!(stats.failed_passes(), vec![DerivedPass::Rollup]);
    assert_eq!(derived_edge_counts(&reader).await, [2, 2, 0]);
    assert_eq!(reader.district_totals(1).await.unwrap(), Some((0, 0)));

    client
        .inner()
        .run(query("DROP CONSTRAINT district_total_unique"))
        .await
        .unwrap();
    builder.run_pass(DerivedPass::Rollup).await.unwrap();

    assert_eq!(reader.district_totals(1).await.unwrap(), Some((1, 3)));
    assert_eq!(reader.district_totals(2).await.unwrap(), Some((1, 0)));
}
