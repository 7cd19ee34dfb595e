use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::world::{CountryShape, GeoPoint, Polygon, Ring, feature_id, feature_name};

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for null geometry and for point/line geometry, which carry no area.
    pub polygons: Option<Vec<Polygon>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, FormatError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, FormatError> {
        let obj = value
            .as_object()
            .ok_or_else(|| FormatError::UnsupportedDocument("non-object".to_string()))?;
        let ty = obj.get("type").and_then(|v| v.as_str()).unwrap_or_default();
        if ty != "FeatureCollection" {
            return Err(FormatError::UnsupportedDocument(ty.to_string()));
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FormatError::InvalidFeature {
                index: 0,
                reason: "FeatureCollection missing features array".to_string(),
            })?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| FormatError::InvalidFeature {
                    index,
                    reason: "feature must be an object".to_string(),
                })?;

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let polygons = match feat_obj.get("geometry") {
                None | Some(Value::Null) => None,
                Some(g) => parse_area_geometry(g)
                    .map_err(|reason| FormatError::InvalidFeature { index, reason })?,
            };

            features.push(Feature {
                id: feature_id(feat_obj.get("id")),
                properties,
                polygons,
            });
        }

        Ok(Self { features })
    }

    pub fn into_countries(self) -> Vec<CountryShape> {
        self.features
            .into_iter()
            .filter_map(|f| {
                let polygons = f.polygons?;
                Some(CountryShape::new(f.id, feature_name(&f.properties), polygons))
            })
            .collect()
    }
}

fn parse_area_geometry(value: &Value) -> Result<Option<Vec<Polygon>>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    match ty {
        "Polygon" | "MultiPolygon" => {}
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" => return Ok(None),
        other => return Err(format!("unsupported geometry type: {other}")),
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;
    if ty == "Polygon" {
        Ok(Some(vec![parse_polygon(coords)?]))
    } else {
        Ok(Some(parse_multi_polygon(coords)?))
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_polygon(coords: &Value) -> Result<Polygon, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Polygon>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}
