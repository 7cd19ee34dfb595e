use foundation::Aabb2;
use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::geojson::FeatureCollection;
use crate::topology::Topology;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

pub type Ring = Vec<GeoPoint>;
/// Outer ring followed by its holes.
pub type Polygon = Vec<Ring>;

/// A named country outline from the world dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryShape {
    pub id: Option<String>,
    pub name: String,
    pub polygons: Vec<Polygon>,
    /// Geographic extent: `x` is longitude, `y` latitude (degrees).
    pub bounds: Aabb2,
}

impl CountryShape {
    pub fn new(id: Option<String>, name: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        let mut bounds = Aabb2::empty();
        for p in polygons.iter().flat_map(|poly| poly.iter().flatten()) {
            bounds.extend(p.lon_deg, p.lat_deg);
        }
        Self {
            id,
            name: name.into(),
            polygons,
            bounds,
        }
    }

    /// Even-odd point-in-polygon test in lon/lat space.
    pub fn contains(&self, lon_deg: f64, lat_deg: f64) -> bool {
        if !self.bounds.contains(lon_deg, lat_deg) {
            return false;
        }
        self.polygons.iter().any(|poly| {
            poly.iter()
                .filter(|ring| ring_contains(ring, lon_deg, lat_deg))
                .count()
                % 2
                == 1
        })
    }
}

fn ring_contains(ring: &[GeoPoint], x: f64, y: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.lat_deg > y) != (b.lat_deg > y)
            && x < (b.lon_deg - a.lon_deg) * (y - a.lat_deg) / (b.lat_deg - a.lat_deg) + a.lon_deg
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Picks a display name out of a feature's properties.
pub(crate) fn feature_name(properties: &Map<String, Value>) -> String {
    ["name", "NAME", "ADMIN", "admin", "name_long"]
        .iter()
        .find_map(|key| properties.get(*key).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn feature_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes a world-geometry document.
///
/// Accepts a TopoJSON `Topology` (the `countries` object, or the first object
/// when there is none by that name) or a GeoJSON `FeatureCollection`.
/// Features without area geometry are dropped.
pub fn decode_world(payload: &str) -> Result<Vec<CountryShape>, FormatError> {
    let value: Value = serde_json::from_str(payload)?;
    decode_world_value(value)
}

pub fn decode_world_value(value: Value) -> Result<Vec<CountryShape>, FormatError> {
    let ty = value
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("<missing>")
        .to_string();
    match ty.as_str() {
        "Topology" => Topology::from_value(value)?.countries(None),
        "FeatureCollection" => Ok(FeatureCollection::from_value(value)?.into_countries()),
        _ => Err(FormatError::UnsupportedDocument(ty)),
    }
}
