//! Neo4j via testcontainers for the graph integration tests.

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::GraphClient;

const TEST_PASSWORD: &str = "parkgraph-test";

/// Start a Neo4j community container and connect to it.
///
/// The container stops when the returned handle is dropped, so hold it for
/// the whole test.
pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
    let container = GenericImage::new("neo4j", "5.25.1")
        .with_exposed_port(ContainerPort::Tcp(7687))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("neo4j/{TEST_PASSWORD}"))
        .start()
        .await
        .expect("Failed to start Neo4j container");

    let port = container
        .get_host_port_ipv4(7687)
        .await
        .expect("Failed to get Neo4j host port");

    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), "neo4j", TEST_PASSWORD)
        .await
        .expect("Failed to connect to Neo4j");

    (container, client)
}
