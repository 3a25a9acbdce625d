use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use parkgraph_common::{GeoPoint, ParkingError};

use crate::traits::Geocoder;

const MAX_ADDRESS_LEN: usize = 200;
const USER_AGENT: &str = "parkgraph/0.1";

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim `search` endpoint.
#[derive(Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        if address.len() > MAX_ADDRESS_LEN {
            return Err(ParkingError::Geocoding(format!(
                "address too long (max {MAX_ADDRESS_LEN} chars)"
            ))
            .into());
        }

        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let results: Vec<NominatimResult> = resp.json().await?;
        let Some(first) = results.into_iter().next() else {
            debug!(address, "No geocoding match");
            return Ok(None);
        };

        let lat: f64 = first
            .lat
            .parse()
            .map_err(|_| ParkingError::Geocoding(format!("bad latitude '{}'", first.lat)))?;
        let lon: f64 = first
            .lon
            .parse()
            .map_err(|_| ParkingError::Geocoding(format!("bad longitude '{}'", first.lon)))?;
        Ok(Some(GeoPoint::new(lat, lon)))
    }
}
