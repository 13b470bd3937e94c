//! Sample pair to screen coordinate mapping
//!
//! ```text
//! x = scale(right, W/2) + W/2
//! y = scale(-left, H/2) + H/2
//! ```
//!
//! `scale` is a fixed-point multiply followed by a right shift by the
//! sample's full-scale exponent, so a full-scale sample lands on the edge
//! of the screen.

use crate::audio::PcmSpec;

/// Whether the trace is drawn for the window or for the exported video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Screen,
    /// Axes swapped; exported frames are serialized column-major
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn transposed(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    pub fn clamped(self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.clamp(0, width.saturating_sub(1) as i32),
            y: self.y.clamp(0, height.saturating_sub(1) as i32),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    width: u32,
    height: u32,
    half_width: i64,
    half_height: i64,
    shift: u32,
    orientation: Orientation,
}

impl CoordinateMapper {
    pub fn new(width: u32, height: u32, spec: &PcmSpec, orientation: Orientation) -> Self {
        Self {
            width,
            height,
            half_width: (width / 2) as i64,
            half_height: (height / 2) as i64,
            shift: spec.full_scale_shift(),
            orientation,
        }
    }

    /// Shift the magnitude rather than the signed value so the mapping stays
    /// odd: `scale(-v) == -scale(v)`.
    fn scale(&self, value: i32, half: i64) -> i64 {
        let magnitude = (value as i64).abs() * half >> self.shift;
        if value < 0 { -magnitude } else { magnitude }
    }

    /// Map without clamping. Full-scale negative input can land one pixel
    /// past the far edge.
    pub fn map_unclamped(&self, left: i32, right: i32) -> Coordinate {
        let x = self.scale(right, self.half_width) + self.half_width;
        let y = -self.scale(left, self.half_height) + self.half_height;
        let coordinate = Coordinate::new(x as i32, y as i32);

        match self.orientation {
            Orientation::Screen => coordinate,
            Orientation::Export => coordinate.transposed(),
        }
    }

    pub fn map(&self, left: i32, right: i32) -> Coordinate {
        let coordinate = self.map_unclamped(left, right);
        match self.orientation {
            Orientation::Screen => coordinate.clamped(self.width, self.height),
            Orientation::Export => coordinate.clamped(self.height, self.width),
        }
    }
}
