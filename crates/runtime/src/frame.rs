/// Deterministic frame metadata.
///
/// Frames are counted, not timed: everything derived from a frame (rotation
/// angle, rendered output) depends on `index` only, so any frame can be
/// reproduced without running the loop up to it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Nominal delta time between frames (seconds).
    pub dt_s: f64,
}

/// Nominal display refresh interval.
pub const DEFAULT_FRAME_DT_S: f64 = 1.0 / 60.0;

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self { index, dt_s }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }

    /// Nominal time since frame zero (seconds).
    pub fn elapsed_s(&self) -> f64 {
        self.index as f64 * self.dt_s
    }
}
