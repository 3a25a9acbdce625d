use neo4rs::query;
use tracing::info;

use crate::GraphClient;

/// Uniqueness constraints on every node key. Neo4j 5 syntax.
const CONSTRAINTS: [&str; 6] = [
    "CREATE CONSTRAINT district_name IF NOT EXISTS FOR (n:District) REQUIRE n.name IS UNIQUE",
    "CREATE CONSTRAINT regulation_name IF NOT EXISTS FOR (n:Regulation) REQUIRE n.name IS UNIQUE",
    "CREATE CONSTRAINT spot_type_name IF NOT EXISTS FOR (n:SpotType) REQUIRE n.name IS UNIQUE",
    "CREATE CONSTRAINT zone_name IF NOT EXISTS FOR (n:Zone) REQUIRE n.name IS UNIQUE",
    "CREATE CONSTRAINT street_name IF NOT EXISTS FOR (n:Street) REQUIRE n.name IS UNIQUE",
    "CREATE CONSTRAINT spot_id IF NOT EXISTS FOR (n:Spot) REQUIRE n.id IS UNIQUE",
];

/// Delete every node and relationship.
pub async fn wipe(client: &GraphClient) -> Result<(), neo4rs::Error> {
    client.graph.run(query("MATCH (n) DETACH DELETE n")).await?;
    info!("Graph wiped");
    Ok(())
}

/// Create the node-key constraints. Existing equivalents are skipped.
pub async fn ensure_constraints(client: &GraphClient) -> Result<(), neo4rs::Error> {
    for c in &CONSTRAINTS {
        run_ignoring_exists(&client.graph, c).await?;
    }
    info!(count = CONSTRAINTS.len(), "Uniqueness constraints in place");
    Ok(())
}

/// A constraint created under another name reports "equivalent ... already
/// exists" even with IF NOT EXISTS.
async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) if is_already_exists(&e.to_string()) => {
            info!("Already exists (skipped): {}", cypher.chars().take(80).collect::<String>());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_already_exists(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("already exists") || msg.contains("equivalent")
}
