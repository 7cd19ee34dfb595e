use formats::{CountryShape, GeoPoint};
use foundation::{Aabb2, Mulberry32, string_seed};

/// Speckles generated per visited country.
pub const SPECKLE_COUNT: usize = 28;
pub const SPECKLE_RADIUS_PX: (f64, f64) = (0.6, 2.2);
pub const SPECKLE_OPACITY: (f64, f64) = (0.35, 0.95);

/// Decorative light point anchored to a geographic position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Speckle {
    pub lon_deg: f64,
    pub lat_deg: f64,
    /// Screen radius in pixels.
    pub radius: f64,
    pub opacity: f64,
}

/// Seed for a country's speckle pattern.
pub fn speckle_seed(canonical_name: &str) -> u32 {
    string_seed(canonical_name)
}

/// Area speckles are drawn from: the extent of the country's largest outer
/// ring, with longitudes unwrapped so a ring crossing the antimeridian spans
/// e.g. 177..182 instead of -180..180.
///
/// Falls back to the shape's own bounds when it has no usable ring.
pub fn sampling_bounds(shape: &CountryShape) -> Aabb2 {
    shape
        .polygons
        .iter()
        .filter_map(|poly| poly.first())
        .map(|outer| unwrapped_extent(outer))
        .filter(|b| !b.is_empty())
        .max_by(|a, b| area(a).total_cmp(&area(b)))
        .unwrap_or(shape.bounds)
}

fn unwrapped_extent(ring: &[GeoPoint]) -> Aabb2 {
    let mut bounds = Aabb2::empty();
    let mut prev: Option<f64> = None;
    for p in ring {
        let mut lon = p.lon_deg;
        if let Some(prev) = prev {
            while lon - prev > 180.0 {
                lon -= 360.0;
            }
            while prev - lon > 180.0 {
                lon += 360.0;
            }
        }
        bounds.extend(lon, p.lat_deg);
        prev = Some(lon);
    }
    bounds
}

fn area(b: &Aabb2) -> f64 {
    b.width() * b.height()
}

fn wrap_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// Generates the fixed speckle pattern of one country.
///
/// Depends only on `canonical_name` and `bounds`, so every call for the same
/// country returns the same points.
pub fn generate_speckles(canonical_name: &str, bounds: &Aabb2) -> Vec<Speckle> {
    if bounds.is_empty() {
        return Vec::new();
    }
    let mut rng = Mulberry32::new(speckle_seed(canonical_name));
    (0..SPECKLE_COUNT)
        .map(|_| {
            let (lon, lat_deg) = bounds.lerp(rng.next_f64(), rng.next_f64());
            let lon_deg = wrap_lon(lon);
            let radius = rng.range(SPECKLE_RADIUS_PX.0, SPECKLE_RADIUS_PX.1);
            let opacity = rng.range(SPECKLE_OPACITY.0, SPECKLE_OPACITY.1);
            Speckle {
                lon_deg,
                lat_deg,
                radius,
                opacity,
            }
        })
        .collect()
}
