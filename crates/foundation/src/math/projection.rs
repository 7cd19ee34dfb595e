//! Orthographic globe projection.
//!
//! A point is first rotated by the globe's longitude offset, then tilted
//! around the east-west axis, then dropped onto the screen plane. Screen `y`
//! grows downwards.

use super::{Vec2, Vec3};

/// Result of projecting one geographic point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projected {
    pub point: Vec2,
    /// `true` when the point lies on the hemisphere facing the viewer.
    pub visible: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Orthographic {
    pub center: Vec2,
    pub radius: f64,
    /// Longitude offset in degrees, added to every longitude.
    pub rotate_deg: f64,
    /// Latitude tilt in degrees; positive values show more of the southern hemisphere.
    pub tilt_deg: f64,
}

impl Orthographic {
    pub fn new(center: Vec2, radius: f64) -> Self {
        Self {
            center,
            radius,
            rotate_deg: 0.0,
            tilt_deg: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotate_deg: f64, tilt_deg: f64) -> Self {
        self.rotate_deg = rotate_deg;
        self.tilt_deg = tilt_deg;
        self
    }

    /// Rotates a geographic point into view space: `x` towards the viewer,
    /// `y` to the right, `z` up.
    pub fn to_view(&self, lon_deg: f64, lat_deg: f64) -> Vec3 {
        let p = Vec3::from_lon_lat_deg(lon_deg + self.rotate_deg, lat_deg);
        let (sin_t, cos_t) = self.tilt_deg.to_radians().sin_cos();
        Vec3::new(p.x * cos_t - p.z * sin_t, p.y, p.z * cos_t + p.x * sin_t)
    }

    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Projected {
        let v = self.to_view(lon_deg, lat_deg);
        Projected {
            point: self.to_screen(v.y, v.z),
            visible: v.x >= 0.0,
        }
    }

    /// Projects a point, pulling far-side points onto the limb.
    ///
    /// Outlines that cross the horizon stay closed this way instead of folding
    /// back over the visible face.
    pub fn project_clamped(&self, lon_deg: f64, lat_deg: f64) -> Projected {
        let v = self.to_view(lon_deg, lat_deg);
        if v.x >= 0.0 {
            return Projected {
                point: self.to_screen(v.y, v.z),
                visible: true,
            };
        }
        let len = (v.y * v.y + v.z * v.z).sqrt();
        let (y, z) = if len > 0.0 {
            (v.y / len, v.z / len)
        } else {
            (1.0, 0.0)
        };
        Projected {
            point: self.to_screen(y, z),
            visible: false,
        }
    }

    fn to_screen(&self, right: f64, up: f64) -> Vec2 {
        Vec2::new(
            self.center.x + self.radius * right,
            self.center.y - self.radius * up,
        )
    }
}
