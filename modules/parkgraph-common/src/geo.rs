use geo::{Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Geodesic distance to `other` on the WGS84 ellipsoid, in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        geodesic_meters(self.lat, self.lon, other.lat, other.lon)
    }
}

/// GeoJSON point geometry. Coordinates are longitude first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [point.lon, point.lat],
        }
    }

    pub fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Inclusive lat/lon envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

/// Envelope a surveyed parking location must fall in. Anything outside is a
/// data-quality error, not an address.
pub const CITY_BBOX: BoundingBox = BoundingBox {
    min_lat: 48.8,
    max_lat: 48.9,
    min_lon: 2.2,
    max_lon: 2.5,
};

/// Fallback map centre (Paris, Hôtel de Ville).
pub const CITY_CENTER: GeoPoint = GeoPoint::new(48.8566, 2.3522);

/// Geodesic distance between two lat/lon points on the WGS84 ellipsoid, in
/// meters.
pub fn geodesic_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Geodesic.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}
