//! Read-side API consumed by the front end.
//!
//! Attribute and proximity search go to the document store; zone lookups and
//! nearby alternatives go to the graph. Nothing here writes.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use parkgraph_common::{
    DistinctField, District, GeoPoint, NormalizedDocument, SearchFilters, CITY_CENTER,
};
use parkgraph_graph::{NearbySpot, DEFAULT_NEARBY_RADIUS_M};
use parkgraph_store::{DocumentStore, DEFAULT_SEARCH_LIMIT};

use crate::traits::{Geocoder, GraphLookup};

/// Radius used when a search is driven by a free-text address.
pub const ADDRESS_SEARCH_RADIUS_M: f64 = 500.0;

/// Option lists for the search form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub districts: Vec<u8>,
    pub regulations: Vec<String>,
    pub spot_types: Vec<String>,
    pub zones: Vec<String>,
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphLookup>,
    geocoder: Arc<dyn Geocoder>,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        graph: Arc<dyn GraphLookup>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            store,
            graph,
            geocoder,
        }
    }

    /// Spots matching `filters`.
    ///
    /// With an address the other filters are ignored: the address is
    /// geocoded and spots within [`ADDRESS_SEARCH_RADIUS_M`] are returned.
    /// An address that cannot be geocoded yields no results.
    pub async fn search_spots(&self, filters: SearchFilters) -> Result<Vec<NormalizedDocument>> {
        let filters = filters.cleaned();

        let Some(address) = filters.address.as_deref() else {
            return Ok(self.store.search(&filters, DEFAULT_SEARCH_LIMIT).await?);
        };

        let origin = match self.geocoder.geocode(address).await {
            Ok(Some(point)) => point,
            Ok(None) => {
                info!(address, "Address not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(address, error = %e, "Geocoding failed");
                return Ok(Vec::new());
            }
        };

        Ok(self
            .store
            .proximity_search(origin, ADDRESS_SEARCH_RADIUS_M)
            .await?)
    }

    /// Zone names in district `number`. Numbers outside 1–20 have none.
    pub async fn zones_for_district(&self, number: i64) -> Result<Vec<String>> {
        if District::new(number).is_none() {
            return Ok(Vec::new());
        }
        self.graph.zones_for_district(number).await
    }

    pub async fn distinct_filter_values(&self, field: DistinctField) -> Result<Vec<String>> {
        Ok(self.store.distinct_values(field).await?)
    }

    /// Spots near a point, nearest first. `radius_m` defaults to
    /// [`DEFAULT_NEARBY_RADIUS_M`].
    pub async fn nearby_alternatives(
        &self,
        lat: f64,
        lon: f64,
        radius_m: Option<f64>,
    ) -> Result<Vec<NearbySpot>> {
        let radius = radius_m.unwrap_or(DEFAULT_NEARBY_RADIUS_M);
        self.graph
            .nearby_alternatives(GeoPoint::new(lat, lon), radius)
            .await
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions {
            districts: District::all().map(District::number).collect(),
            regulations: self.distinct_filter_values(DistinctField::Regulation).await?,
            spot_types: self.distinct_filter_values(DistinctField::SpotType).await?,
            zones: self.distinct_filter_values(DistinctField::Zone).await?,
        })
    }

    /// Where to centre a map of `results`: the first result's raw
    /// coordinates, else the city centre.
    pub fn map_center(results: &[NormalizedDocument]) -> GeoPoint {
        results
            .first()
            .and_then(|doc| doc.geo_point)
            .unwrap_or(CITY_CENTER)
    }
}
