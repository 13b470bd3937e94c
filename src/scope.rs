//! Phosphor screen emulation
//!
//! - `mapper`: sample pair to pixel coordinate
//! - `frame`: the visible pixel buffer
//! - `glyph`, `grid`: sprites drawn once at startup
//! - `compositor`: fade, grid and dot stamping per sub-frame

mod compositor;
mod frame;
mod glyph;
mod grid;
mod mapper;

use crate::colors::Rgb;
use tiny_skia::{Paint, Pixmap, Rect, Transform};

pub use compositor::Compositor;
pub use frame::DisplayFrame;
pub use glyph::DotGlyph;
pub use grid::GridOverlay;
pub use mapper::{Coordinate, CoordinateMapper, Orientation};

/// Opaque, pixel-aligned rectangle fill. Degenerate rects are skipped.
fn fill_rect(pixmap: &mut Pixmap, x: u32, y: u32, width: u32, height: u32, color: Rgb) {
    let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(color.to_color());
    paint.anti_alias = false;

    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}
