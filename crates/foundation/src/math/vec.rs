#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Point on (or near) the unit sphere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit vector for a longitude/latitude pair in degrees.
    ///
    /// `x` points at (0°, 0°), `y` at (90°E, 0°), `z` at the north pole.
    pub fn from_lon_lat_deg(lon_deg: f64, lat_deg: f64) -> Self {
        let lon = lon_deg.to_radians();
        let lat = lat_deg.to_radians();
        let cos_lat = lat.cos();
        Self::new(cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::{Vec2, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn vec2_add_sub_length() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(-0.5, 4.0);
        assert_eq!(a + b, Vec2::new(0.5, 6.0));
        assert_eq!(a - b, Vec2::new(1.5, -2.0));
        assert_eq!(Vec2::new(3.0, 4.0).length(), 5.0);
    }

    #[test]
    fn unit_vectors_from_lon_lat() {
        let east = Vec3::from_lon_lat_deg(90.0, 0.0);
        assert_close(east.x, 0.0, 1e-12);
        assert_close(east.y, 1.0, 1e-12);

        let pole = Vec3::from_lon_lat_deg(123.0, 90.0);
        assert_close(pole.z, 1.0, 1e-12);
        assert_close(pole.x * pole.x + pole.y * pole.y, 0.0, 1e-12);
    }
}
