use neo4rs::{query, ConfigBuilder, Graph};
use tracing::info;

use parkgraph_common::Config;

/// Pooled handle to the parking graph. Cheap to clone.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(4)
            .build()?;
        let graph = Graph::connect(config).await?;
        Ok(Self { graph })
    }

    /// Connect using the NEO4J_* settings and verify the server answers.
    pub async fn from_config(config: &Config) -> Result<Self, neo4rs::Error> {
        let client =
            Self::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await?;
        client.ping().await?;
        info!(uri = %config.neo4j_uri, "Connected to graph store");
        Ok(client)
    }

    /// Round-trip a trivial query. The pool connects lazily, so this is the
    /// first point a bad URI or credential surfaces.
    pub async fn ping(&self) -> Result<(), neo4rs::Error> {
        self.graph.run(query("RETURN 1")).await
    }

    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
