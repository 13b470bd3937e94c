//! The beam spot sprite

use super::fill_rect;
use crate::colors::{DOT1, DOT2, DOT3, DOT4, DOT5, DOT6, DOT7, Rgb};
use tiny_skia::{Pixmap, PixmapRef};

pub const GLYPH_SIZE: u32 = 7;

/// Rings painted outermost first; each fill covers part of the previous one.
const RINGS: &[(Rgb, &[(u32, u32, u32, u32)])] = &[
    (DOT7, &[(0, 0, 7, 7)]),
    (DOT6, &[(1, 0, 5, 7), (0, 1, 7, 5)]),
    (DOT5, &[(1, 1, 5, 5)]),
    (DOT4, &[(2, 1, 3, 5), (1, 2, 5, 3)]),
    (DOT3, &[(2, 2, 3, 3)]),
    (DOT2, &[(3, 2, 1, 3), (2, 3, 3, 1)]),
    (DOT1, &[(3, 3, 1, 1)]),
];

/// 7x7 ring bitmap plus the global alpha it is stamped with
pub struct DotGlyph {
    pixmap: Pixmap,
    alpha: u8,
}

impl DotGlyph {
    pub fn new(alpha: u8) -> Option<Self> {
        let mut pixmap = Pixmap::new(GLYPH_SIZE, GLYPH_SIZE)?;
        for (color, rects) in RINGS {
            for &(x, y, width, height) in *rects {
                fill_rect(&mut pixmap, x, y, width, height, *color);
            }
        }
        Some(Self { pixmap, alpha })
    }

    pub fn sprite(&self) -> PixmapRef<'_> {
        self.pixmap.as_ref()
    }

    pub fn opacity(&self) -> f32 {
        self.alpha as f32 / 255.0
    }

    /// Offset from the glyph's top-left corner to its center pixel
    pub fn radius(&self) -> i32 {
        (GLYPH_SIZE / 2) as i32
    }

    #[cfg(test)]
    fn color_at(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= GLYPH_SIZE || y >= GLYPH_SIZE {
            return None;
        }
        self.pixmap
            .pixel(x, y)
            .map(|px| Rgb::from_color_u8(px.demultiply()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_rings() {
        let glyph = DotGlyph::new(255).unwrap();
        assert_eq!(glyph.color_at(3, 3), Some(DOT1));
        assert_eq!(glyph.color_at(3, 2), Some(DOT2));
        assert_eq!(glyph.color_at(2, 3), Some(DOT2));
        assert_eq!(glyph.color_at(2, 2), Some(DOT3));
        assert_eq!(glyph.color_at(3, 1), Some(DOT4));
        assert_eq!(glyph.color_at(1, 1), Some(DOT5));
        assert_eq!(glyph.color_at(3, 0), Some(DOT6));
        assert_eq!(glyph.color_at(0, 0), Some(DOT7));
        assert_eq!(glyph.color_at(6, 6), Some(DOT7));
    }

    #[test]
    fn test_glyph_is_symmetric() {
        let glyph = DotGlyph::new(255).unwrap();
        for y in 0..GLYPH_SIZE {
            for x in 0..GLYPH_SIZE {
                let mirrored = GLYPH_SIZE - 1 - x;
                assert_eq!(glyph.color_at(x, y), glyph.color_at(mirrored, y));
                assert_eq!(glyph.color_at(x, y), glyph.color_at(y, x));
            }
        }
    }

    #[test]
    fn test_brightness_falls_off_from_center() {
        let glyph = DotGlyph::new(255).unwrap();
        let along_row: Vec<u32> = (3..GLYPH_SIZE)
            .map(|x| glyph.color_at(x, 3).unwrap().intensity())
            .collect();
        assert!(along_row.windows(2).all(|w| w[0] > w[1]), "{:?}", along_row);
    }

    #[test]
    fn test_opacity() {
        assert_eq!(DotGlyph::new(255).unwrap().opacity(), 1.0);
        assert_eq!(DotGlyph::new(0).unwrap().opacity(), 0.0);
        assert_eq!(DotGlyph::new(255).unwrap().radius(), 3);
    }
}
