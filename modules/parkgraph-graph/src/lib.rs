pub mod builder;
pub mod client;
pub mod reader;
pub mod schema;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use builder::{DerivedPass, GraphBuilder, PassOutcome, RebuildStats, GRAPH_BATCH_SIZE};
pub use client::GraphClient;
pub use reader::{GraphReader, NearbySpot, DEFAULT_NEARBY_RADIUS_M, NEARBY_LIMIT};
