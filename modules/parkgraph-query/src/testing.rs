// Test doubles for QueryService.
//
// - FixedGeocoder (Geocoder): address → point lookup table, optional failure
// - MockGraph (GraphLookup): canned zones and nearby spots, records calls

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use parkgraph_common::GeoPoint;
use parkgraph_graph::NearbySpot;

use crate::traits::{Geocoder, GraphLookup};

pub use parkgraph_store::testing::MemoryDocumentStore;

/// Returns `None` for unregistered addresses; every lookup fails when
/// built with [`FixedGeocoder::failing`].
#[derive(Default)]
pub struct FixedGeocoder {
    points: HashMap<String, GeoPoint>,
    fail: bool,
}

impl FixedGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn on(mut self, address: &str, point: GeoPoint) -> Self {
        self.points.insert(address.to_string(), point);
        self
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        if self.fail {
            bail!("geocoder unavailable");
        }
        Ok(self.points.get(address).copied())
    }
}

#[derive(Default)]
pub struct MockGraph {
    zones: HashMap<i64, Vec<String>>,
    nearby: Vec<NearbySpot>,
    nearby_calls: Mutex<Vec<(GeoPoint, f64)>>,
    zone_calls: Mutex<Vec<i64>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zones(mut self, district: i64, zones: &[&str]) -> Self {
        self.zones
            .insert(district, zones.iter().map(|z| z.to_string()).collect());
        self
    }

    pub fn with_nearby(mut self, spots: Vec<NearbySpot>) -> Self {
        self.nearby = spots;
        self
    }

    pub fn nearby_calls(&self) -> Vec<(GeoPoint, f64)> {
        self.nearby_calls.lock().unwrap().clone()
    }

    pub fn zone_calls(&self) -> Vec<i64> {
        self.zone_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphLookup for MockGraph {
    async fn zones_for_district(&self, number: i64) -> Result<Vec<String>> {
        self.zone_calls.lock().unwrap().push(number);
        Ok(self.zones.get(&number).cloned().unwrap_or_default())
    }

    async fn nearby_alternatives(
        &self,
        origin: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbySpot>> {
        self.nearby_calls.lock().unwrap().push((origin, radius_m));
        Ok(self.nearby.clone())
    }
}
