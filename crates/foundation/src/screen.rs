/// Position in screen space (CSS pixels, origin top-left).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Integer grid cell containing this point for a square cell of `cell_px`.
    pub fn cell(&self, cell_px: f64) -> (i64, i64) {
        (
            (self.x / cell_px).floor() as i64,
            (self.y / cell_px).floor() as i64,
        )
    }
}
