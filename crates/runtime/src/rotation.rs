use crate::frame::Frame;

/// Longitude advanced per frame (degrees).
pub const ROTATION_STEP_DEG: f64 = 0.2;
/// Fixed latitude tilt (degrees).
pub const ROTATION_TILT_DEG: f64 = -15.0;

/// Globe orientation: a longitude offset that spins and a fixed tilt.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rotation {
    lon_deg: f64,
    step_deg: f64,
    tilt_deg: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(ROTATION_STEP_DEG, ROTATION_TILT_DEG)
    }
}

impl Rotation {
    pub fn new(step_deg: f64, tilt_deg: f64) -> Self {
        Self {
            lon_deg: 0.0,
            step_deg,
            tilt_deg,
        }
    }

    /// Orientation after `frame.index` steps from zero.
    pub fn at_frame(self, frame: Frame) -> Self {
        let raw = frame.index as f64 * self.step_deg;
        Self {
            lon_deg: wrap_degrees(raw),
            ..self
        }
    }

    /// Frames after which the orientation repeats, when the step divides a
    /// full turn.
    pub fn period_frames(&self) -> Option<u64> {
        let step = self.step_deg.abs();
        if !step.is_finite() || step == 0.0 {
            return None;
        }
        let turns = 360.0 / step;
        let n = turns.round();
        (n >= 1.0 && (turns - n).abs() < 1e-6).then_some(n as u64)
    }

    pub fn step(&mut self) {
        self.lon_deg = wrap_degrees(self.lon_deg + self.step_deg);
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon_deg
    }

    pub fn tilt_deg(&self) -> f64 {
        self.tilt_deg
    }
}

/// Wraps an angle into `[0, 360)`.
pub fn wrap_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if w >= 360.0 { 0.0 } else { w }
}
