//! The two ETL phases.
//!
//! Load: fetch both catalog datasets, normalize, replace the document
//! collections. Graph: rebuild the graph from the stored spots. Each phase is
//! a full replacement; nothing is incremental.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use opendata_client::RecordPager;
use parkgraph_common::{Collection, NormalizedDocument};
use parkgraph_graph::{GraphBuilder, RebuildStats};
use parkgraph_store::DocumentStore;

use crate::normalize::normalize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub footprints: u64,
    pub spots: u64,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} footprints, {} spots", self.footprints, self.spots)
    }
}

/// One ETL invocation. The run id tags every log line it emits.
pub struct EtlRun {
    run_id: Uuid,
    store: Arc<dyn DocumentStore>,
}

impl EtlRun {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            store,
        }
    }

    /// Ensure tables and indexes, then reload both collections.
    pub async fn load(
        &self,
        footprints: &dyn RecordPager,
        spots: &dyn RecordPager,
        batch_size: u32,
    ) -> Result<LoadStats> {
        let run_id = self.run_id;
        info!(%run_id, "Load phase starting");

        self.store
            .create_indexes()
            .await
            .context("Failed to create document indexes")?;

        let footprints = self
            .load_collection(Collection::Footprints, footprints, batch_size)
            .await?;
        let spots = self
            .load_collection(Collection::Spots, spots, batch_size)
            .await?;

        let stats = LoadStats { footprints, spots };
        info!(%run_id, %stats, "Load phase finished");
        Ok(stats)
    }

    /// Rebuild the graph from every stored spot.
    pub async fn build_graph(&self, builder: &GraphBuilder) -> Result<RebuildStats> {
        let run_id = self.run_id;
        let docs = self.spots_for_graph().await?;
        info!(%run_id, count = docs.len(), "Graph phase starting");

        let stats = builder
            .rebuild(&docs)
            .await
            .context("Graph rebuild failed")?;
        info!(%run_id, %stats, "Graph phase finished");
        Ok(stats)
    }

    async fn spots_for_graph(&self) -> Result<Vec<NormalizedDocument>> {
        self.store
            .all_documents(Collection::Spots)
            .await
            .context("Failed to read spots for graph build")
    }

    async fn load_collection(
        &self,
        collection: Collection,
        pager: &dyn RecordPager,
        batch_size: u32,
    ) -> Result<u64> {
        let raw = pager.fetch_all(batch_size).await;
        info!(run_id = %self.run_id, %collection, fetched = raw.len(), "Fetched records");

        let docs = normalize(raw);
        let inserted = self
            .store
            .load(collection, &docs)
            .await
            .with_context(|| format!("Failed to load {collection}"))?;
        Ok(inserted)
    }
}
