use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::geo::{GeoPoint, PointGeometry};

/// Field names used by the open-data catalog.
pub mod fields {
    pub const ID: &str = "id";
    pub const DISTRICT: &str = "arrond";
    pub const REGULATION: &str = "regpri";
    pub const SPOT_TYPE: &str = "typsta";
    pub const ZONE: &str = "zoneres";
    pub const STREET: &str = "nomvoie";
    pub const SURFACE: &str = "surface_calculee";
    pub const PLACE_COUNT: &str = "placal";
    pub const SIGNAGE: &str = "signvert";
    pub const SURVEY_DATE: &str = "datereleve";
    pub const GEO_POINT: &str = "geo_point_2d";

    /// Fields the normalizer lifts into typed document fields. Everything else
    /// is carried through untouched.
    pub const CANONICAL: [&str; 11] = [
        ID,
        DISTRICT,
        REGULATION,
        SPOT_TYPE,
        ZONE,
        STREET,
        SURFACE,
        PLACE_COUNT,
        SIGNAGE,
        SURVEY_DATE,
        GEO_POINT,
    ];
}

// --- Raw records ---

/// One record as returned by the remote catalog. No schema is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    /// Value of `field`, treating JSON null as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// --- District ---

/// A numbered administrative subdivision of the city. Only 1–20 exist; the
/// constructor is the single place that range is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct District(u8);

impl District {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;

    pub fn new(number: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&number) {
            Some(Self(number as u8))
        } else {
            None
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Every district, in order.
    pub fn all() -> impl Iterator<Item = District> {
        (Self::MIN..=Self::MAX).map(District)
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for District {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = i64::deserialize(deserializer)?;
        District::new(n)
            .ok_or_else(|| serde::de::Error::custom(format!("district out of range: {n}")))
    }
}

// --- Normalized documents ---

/// Canonical persisted shape of a parking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub id: String,
    pub district: Option<District>,
    pub regulation: Option<String>,
    pub spot_type: Option<String>,
    pub zone: Option<String>,
    pub street: Option<String>,
    pub place_count: Option<i64>,
    pub surface: Option<f64>,
    pub signage: Option<String>,
    pub survey_date: Option<String>,
    /// Raw coordinates as surveyed, kept even when out of bounds.
    pub geo_point: Option<GeoPoint>,
    /// Only set when `geo_point` lies inside the city envelope.
    pub location: Option<PointGeometry>,
    pub loaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl NormalizedDocument {
    /// Bare document with only an id and a timestamp.
    pub fn new(id: impl Into<String>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            district: None,
            regulation: None,
            spot_type: None,
            zone: None,
            street: None,
            place_count: None,
            surface: None,
            signage: None,
            survey_date: None,
            geo_point: None,
            location: None,
            loaded_at,
            extra: Map::new(),
        }
    }

    pub fn has_valid_geometry(&self) -> bool {
        self.location.is_some()
    }
}

// --- Collections ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Broad parking-area records.
    Footprints,
    /// Individual parking locations.
    Spots,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Self::Footprints => "footprints",
            Self::Spots => "spots",
        }
    }

    /// Insert batch size; spots are the higher-volume collection.
    pub fn insert_batch_size(self) -> usize {
        match self {
            Self::Footprints => 100,
            Self::Spots => 500,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Document fields that can be enumerated for filter option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistinctField {
    District,
    Regulation,
    SpotType,
    Zone,
    Street,
}

impl DistinctField {
    pub fn column(self) -> &'static str {
        match self {
            Self::District => "district",
            Self::Regulation => "regulation",
            Self::SpotType => "spot_type",
            Self::Zone => "zone",
            Self::Street => "street",
        }
    }

    /// Field name in the remote catalog records.
    pub fn source_field(self) -> &'static str {
        match self {
            Self::District => fields::DISTRICT,
            Self::Regulation => fields::REGULATION,
            Self::SpotType => fields::SPOT_TYPE,
            Self::Zone => fields::ZONE,
            Self::Street => fields::STREET,
        }
    }

    /// Accepts either the document field name or the catalog's source name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "district" | fields::DISTRICT => Some(Self::District),
            "regulation" | fields::REGULATION => Some(Self::Regulation),
            "spot_type" | fields::SPOT_TYPE => Some(Self::SpotType),
            "zone" | fields::ZONE => Some(Self::Zone),
            "street" | fields::STREET => Some(Self::Street),
            _ => None,
        }
    }
}

// --- Search filters ---

/// Attribute filters for spot search. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact match.
    pub district: Option<i64>,
    /// Case-insensitive substring.
    pub regulation: Option<String>,
    /// Case-insensitive substring.
    pub spot_type: Option<String>,
    /// Exact match.
    pub zone: Option<String>,
    /// Case-insensitive substring.
    pub street: Option<String>,
    /// Free-text address; switches search to proximity mode.
    pub address: Option<String>,
}

impl SearchFilters {
    /// Drop blank text filters so they don't constrain the query.
    pub fn cleaned(self) -> Self {
        fn non_blank(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            district: self.district,
            regulation: non_blank(self.regulation),
            spot_type: non_blank(self.spot_type),
            zone: non_blank(self.zone),
            street: non_blank(self.street),
            address: non_blank(self.address),
        }
    }

    /// Whether `doc` satisfies every attribute filter. `address` is not an
    /// attribute filter and is ignored here.
    pub fn matches(&self, doc: &NormalizedDocument) -> bool {
        if let Some(d) = self.district {
            if doc.district.map(|x| i64::from(x.number())) != Some(d) {
                return false;
            }
        }
        if let Some(zone) = &self.zone {
            if doc.zone.as_deref() != Some(zone.as_str()) {
                return false;
            }
        }
        contains_ci(doc.regulation.as_deref(), self.regulation.as_deref())
            && contains_ci(doc.spot_type.as_deref(), self.spot_type.as_deref())
            && contains_ci(doc.street.as_deref(), self.street.as_deref())
    }
}

fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match (haystack, needle) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(h), Some(n)) => h.to_lowercase().contains(&n.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(district: Option<i64>, regulation: &str, street: &str) -> NormalizedDocument {
        let mut d = NormalizedDocument::new("x", Utc::now());
        d.district = district.and_then(District::new);
        d.regulation = Some(regulation.to_string());
        d.street = Some(street.to_string());
        d
    }

    #[test]
    fn district_range_is_one_to_twenty() {
        assert!(District::new(0).is_none());
        assert_eq!(District::new(1).map(District::number), Some(1));
        assert_eq!(District::new(20).map(District::number), Some(20));
        assert!(District::new(21).is_none());
        assert!(District::new(-3).is_none());
        assert_eq!(District::all().count(), 20);
    }

    #[test]
    fn district_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<District>("21").is_err());
        assert_eq!(serde_json::from_str::<District>("7").unwrap().number(), 7);
    }

    #[test]
    fn filters_match_substring_case_insensitively() {
        let d = doc(Some(3), "PAYANT MIXTE", "RUE DE BRETAGNE");
        let f = SearchFilters {
            regulation: Some("payant".into()),
            street: Some("bretagne".into()),
            ..Default::default()
        };
        assert!(f.matches(&d));
    }

    #[test]
    fn district_filter_is_exact() {
        let d = doc(Some(3), "PAYANT", "RUE X");
        let hit = SearchFilters { district: Some(3), ..Default::default() };
        let miss = SearchFilters { district: Some(13), ..Default::default() };
        assert!(hit.matches(&d));
        assert!(!miss.matches(&d));
        assert!(!hit.matches(&doc(None, "PAYANT", "RUE X")));
    }

    #[test]
    fn blank_filters_are_dropped() {
        let f = SearchFilters {
            regulation: Some("  ".into()),
            zone: Some(" 3K ".into()),
            ..Default::default()
        }
        .cleaned();
        assert_eq!(f.regulation, None);
        assert_eq!(f.zone.as_deref(), Some("3K"));
    }

    #[test]
    fn distinct_field_accepts_source_names() {
        assert_eq!(DistinctField::parse("regpri"), Some(DistinctField::Regulation));
        assert_eq!(DistinctField::parse("spot_type"), Some(DistinctField::SpotType));
        assert_eq!(DistinctField::parse("surface"), None);
    }

    #[test]
    fn distinct_field_maps_back_to_its_source_name() {
        for field in [
            DistinctField::District,
            DistinctField::Regulation,
            DistinctField::SpotType,
            DistinctField::Zone,
            DistinctField::Street,
        ] {
            assert_eq!(DistinctField::parse(field.source_field()), Some(field));
            assert_eq!(DistinctField::parse(field.column()), Some(field));
        }
        assert_eq!(DistinctField::Zone.source_field(), "zoneres");
    }
}
