//! Phosphor palette
//!
//! The dot glyph is painted with concentric rings, brightest in the middle.
//! These are the only colors the scope ever draws.

use tiny_skia::Color;
#[cfg(test)]
use tiny_skia::ColorU8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_color(self) -> Color {
        Color::from_rgba8(self.r, self.g, self.b, 255)
    }

    #[cfg(test)]
    pub fn from_color_u8(color: ColorU8) -> Self {
        Self::new(color.red(), color.green(), color.blue())
    }

    /// Sum of the three channels, used as a brightness measure
    #[cfg(test)]
    pub fn intensity(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }
}

// Dot rings, center outward
pub const DOT1: Rgb = Rgb::new(63, 255, 191);
pub const DOT2: Rgb = Rgb::new(15, 127, 47);
pub const DOT3: Rgb = Rgb::new(11, 95, 35);
pub const DOT4: Rgb = Rgb::new(7, 31, 23);
pub const DOT5: Rgb = Rgb::new(3, 23, 11);
pub const DOT6: Rgb = Rgb::new(1, 15, 5);
pub const DOT7: Rgb = Rgb::new(0, 7, 3);

pub const GRID: Rgb = Rgb::new(0, 31, 63);
pub const BLACK: Rgb = Rgb::new(0, 0, 0);
