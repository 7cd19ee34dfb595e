//! TopoJSON topology decoding.
//!
//! Arcs are shared between neighbouring polygons and, when the topology is
//! quantized, delta-encoded integer positions scaled by `transform`. Decoding
//! resolves every arc to absolute lon/lat once, then stitches rings from arc
//! references (a negative reference `!i` walks arc `i` backwards).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::world::{CountryShape, GeoPoint, Polygon, Ring, feature_id, feature_name};

/// Name of the object holding country outlines in world atlases.
pub const COUNTRIES_OBJECT: &str = "countries";

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: BTreeMap<String, Value>,
}

impl Topology {
    pub fn from_json_str(payload: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn from_value(value: Value) -> Result<Self, FormatError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Arcs with quantization and delta encoding removed.
    pub fn decoded_arcs(&self) -> Vec<Vec<GeoPoint>> {
        self.arcs
            .iter()
            .map(|arc| {
                let mut x = 0.0;
                let mut y = 0.0;
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| match self.transform {
                        Some(t) => {
                            x += p[0];
                            y += p[1];
                            GeoPoint::new(
                                x * t.scale[0] + t.translate[0],
                                y * t.scale[1] + t.translate[1],
                            )
                        }
                        None => GeoPoint::new(p[0], p[1]),
                    })
                    .collect()
            })
            .collect()
    }

    /// Converts one named object into country shapes.
    ///
    /// With `object = None` the `countries` object is used, falling back to
    /// the first object in name order.
    pub fn countries(&self, object: Option<&str>) -> Result<Vec<CountryShape>, FormatError> {
        let root = match object {
            Some(name) => self
                .objects
                .get(name)
                .ok_or_else(|| FormatError::MissingObject(name.to_string()))?,
            None => self
                .objects
                .get(COUNTRIES_OBJECT)
                .or_else(|| self.objects.values().next())
                .ok_or_else(|| FormatError::MissingObject(COUNTRIES_OBJECT.to_string()))?,
        };

        let arcs = self.decoded_arcs();
        let mut geometries = Vec::new();
        flatten_geometry(root, &mut geometries);

        let mut out = Vec::with_capacity(geometries.len());
        for (index, geom) in geometries.into_iter().enumerate() {
            let ty = geom.get("type").and_then(|v| v.as_str()).unwrap_or_default();
            let arc_refs = geom.get("arcs");
            let polygons = match (ty, arc_refs) {
                ("Polygon", Some(refs)) => vec![stitch_polygon(&arcs, refs, index)?],
                ("MultiPolygon", Some(refs)) => refs
                    .as_array()
                    .ok_or_else(|| invalid(index, "MultiPolygon arcs must be an array"))?
                    .iter()
                    .map(|poly| stitch_polygon(&arcs, poly, index))
                    .collect::<Result<Vec<_>, _>>()?,
                // Null geometry, points and lines carry no area.
                _ => continue,
            };

            let empty = Map::new();
            let properties = geom
                .get("properties")
                .and_then(|v| v.as_object())
                .unwrap_or(&empty);
            out.push(CountryShape::new(
                feature_id(geom.get("id")),
                feature_name(properties),
                polygons,
            ));
        }
        Ok(out)
    }
}

fn flatten_geometry<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    let is_collection = value.get("type").and_then(|v| v.as_str()) == Some("GeometryCollection");
    if !is_collection {
        out.push(value);
        return;
    }
    if let Some(children) = value.get("geometries").and_then(|v| v.as_array()) {
        for child in children {
            flatten_geometry(child, out);
        }
    }
}

fn stitch_polygon(
    arcs: &[Vec<GeoPoint>],
    refs: &Value,
    index: usize,
) -> Result<Polygon, FormatError> {
    refs.as_array()
        .ok_or_else(|| invalid(index, "Polygon arcs must be an array of rings"))?
        .iter()
        .map(|ring| stitch_ring(arcs, ring, index))
        .collect()
}

fn stitch_ring(arcs: &[Vec<GeoPoint>], refs: &Value, index: usize) -> Result<Ring, FormatError> {
    let refs = refs
        .as_array()
        .ok_or_else(|| invalid(index, "ring must be an array of arc indices"))?;

    let mut ring: Ring = Vec::new();
    for r in refs {
        let arc_ref = r
            .as_i64()
            .ok_or_else(|| invalid(index, "arc index must be an integer"))?;
        let (arc_index, reversed) = if arc_ref < 0 {
            (!arc_ref, true)
        } else {
            (arc_ref, false)
        };
        let arc = usize::try_from(arc_index)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or(FormatError::ArcOutOfRange {
                index,
                arc: arc_ref,
            })?;

        // Consecutive arcs share their joining point.
        let skip = usize::from(!ring.is_empty());
        if reversed {
            ring.extend(arc.iter().rev().skip(skip).copied());
        } else {
            ring.extend(arc.iter().skip(skip).copied());
        }
    }
    Ok(ring)
}

fn invalid(index: usize, reason: &str) -> FormatError {
    FormatError::InvalidFeature {
        index,
        reason: reason.to_string(),
    }
}
