//! RecordNormalizer: raw catalog records to canonical documents.
//!
//! Pure and total. Bad input never fails a record; it degrades the affected
//! field to `None`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use parkgraph_common::{
    fields, District, GeoPoint, NormalizedDocument, PointGeometry, RawRecord, CITY_BBOX,
};

/// Normalize a batch, stamping every document with the current time.
pub fn normalize(records: Vec<RawRecord>) -> Vec<NormalizedDocument> {
    normalize_at(records, Utc::now())
}

/// Normalize a batch with an explicit timestamp.
pub fn normalize_at(records: Vec<RawRecord>, now: DateTime<Utc>) -> Vec<NormalizedDocument> {
    records
        .into_iter()
        .map(|record| normalize_record(record, now))
        .collect()
}

fn normalize_record(record: RawRecord, now: DateTime<Utc>) -> NormalizedDocument {
    let id = record
        .get(fields::ID)
        .and_then(text)
        .unwrap_or_else(|| content_id(record.fields()));

    let mut doc = NormalizedDocument::new(id, now);
    doc.district = record.get(fields::DISTRICT).and_then(integer).and_then(District::new);
    doc.regulation = record.get(fields::REGULATION).and_then(text);
    doc.spot_type = record.get(fields::SPOT_TYPE).and_then(text);
    doc.zone = record.get(fields::ZONE).and_then(text);
    doc.street = record.get(fields::STREET).and_then(text);
    doc.signage = record.get(fields::SIGNAGE).and_then(text);
    doc.survey_date = record.get(fields::SURVEY_DATE).and_then(text);
    doc.place_count = record.get(fields::PLACE_COUNT).and_then(integer);
    doc.surface = record.get(fields::SURFACE).and_then(number);

    doc.geo_point = record.get(fields::GEO_POINT).and_then(geo_point);
    doc.location = doc
        .geo_point
        .filter(|p| CITY_BBOX.contains(p))
        .map(PointGeometry::from_point);

    doc.extra = record
        .into_inner()
        .into_iter()
        .filter(|(k, _)| !fields::CANONICAL.contains(&k.as_str()))
        .collect();

    doc
}

/// Trimmed text. Scalars are stringified; blanks and compound values are absent.
fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Finite float from a number or numeric string.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Integer from an integer, an integral float, or a numeric string.
fn integer(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(i);
        }
    }
    let f = number(value)?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

/// `{"lat": .., "lon": ..}` with both parts numeric.
fn geo_point(value: &Value) -> Option<GeoPoint> {
    let obj = value.as_object()?;
    let lat = obj.get("lat").and_then(number)?;
    let lon = obj.get("lon").and_then(number)?;
    Some(GeoPoint::new(lat, lon))
}

/// Stable id for a record that carries none: the first 16 bytes of the
/// SHA-256 of its key-sorted JSON, hex encoded.
fn content_id(fields: &Map<String, Value>) -> String {
    let canonical = sorted_keys(&Value::Object(fields.clone())).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..16])
}

fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}
