//! The visible pixel buffer
//!
//! A thin wrapper around a tiny-skia [`Pixmap`] that provides the three
//! canvas operations the compositor needs: blended rectangle fill, additive
//! sprite blit, and raw pixel readback. The buffer is always fully opaque.

use crate::colors::{BLACK, Rgb};
use tiny_skia::{Pixmap, PixmapPaint, PixmapRef, Transform};

/// Bytes per serialized export pixel (little-endian rgb32)
pub const EXPORT_BYTES_PER_PIXEL: usize = 4;

pub struct DisplayFrame {
    pixmap: Pixmap,
}

impl DisplayFrame {
    /// Returns `None` for a zero-sized frame
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(BLACK.to_color());
        Some(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Color at (x, y), or `None` off-canvas
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixmap
            .pixel(x, y)
            .map(|px| Rgb::from_color_u8(px.demultiply()))
    }

    /// Blend `color` at `alpha` over a rectangle, clipped to the frame.
    ///
    /// Each channel moves toward `color` by `alpha / 255` of the remaining
    /// distance, rounding toward `color`. With a non-zero alpha every channel
    /// that differs from `color` changes by at least one step per call, so
    /// repeated fills converge exactly.
    pub fn blend_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb, alpha: u8) {
        if alpha == 0 {
            return;
        }

        let frame_width = self.width() as i64;
        let frame_height = self.height() as i64;
        let x0 = (x as i64).clamp(0, frame_width) as usize;
        let y0 = (y as i64).clamp(0, frame_height) as usize;
        let x1 = (x as i64 + width as i64).clamp(0, frame_width) as usize;
        let y1 = (y as i64 + height as i64).clamp(0, frame_height) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = frame_width as usize * 4;
        let target = [color.r, color.g, color.b];
        let data = self.pixmap.data_mut();
        for row in data.chunks_exact_mut(stride).skip(y0).take(y1 - y0) {
            for px in row[x0 * 4..x1 * 4].chunks_exact_mut(4) {
                for (channel, &goal) in px[..3].iter_mut().zip(&target) {
                    *channel = blend_channel(*channel, goal, alpha);
                }
                px[3] = 255;
            }
        }
    }

    /// Additively blend a sprite with its top-left corner at (x, y).
    /// Channels saturate at 255; only the part of the sprite that overlaps
    /// the frame is touched.
    pub fn blit_additive(&mut self, sprite: PixmapRef<'_>, x: i32, y: i32, opacity: f32) {
        let scale = (opacity.clamp(0.0, 1.0) * 255.0).round() as u32;
        if scale == 0 {
            return;
        }

        let frame_width = self.width() as i64;
        let frame_height = self.height() as i64;
        let (x, y) = (x as i64, y as i64);
        let x0 = x.clamp(0, frame_width);
        let y0 = y.clamp(0, frame_height);
        let x1 = (x + sprite.width() as i64).clamp(0, frame_width);
        let y1 = (y + sprite.height() as i64).clamp(0, frame_height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let visible = (x1 - x0) as usize * 4;
        let sprite_stride = sprite.width() as usize * 4;
        let frame_stride = frame_width as usize * 4;
        let src = sprite.data();
        let dst = self.pixmap.data_mut();

        for row in y0..y1 {
            // Sprite pixels are premultiplied, so the color channels add directly
            let src_start = (row - y) as usize * sprite_stride + (x0 - x) as usize * 4;
            let dst_start = row as usize * frame_stride + x0 as usize * 4;
            let src_row = &src[src_start..src_start + visible];
            let dst_row = &mut dst[dst_start..dst_start + visible];

            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                for (channel, &add) in d[..3].iter_mut().zip(&s[..3]) {
                    let add = (add as u32 * scale + 127) / 255;
                    *channel = channel.saturating_add(add as u8);
                }
            }
        }
    }

    /// Source-over composite of a full-frame overlay
    pub fn overlay(&mut self, overlay: PixmapRef<'_>) {
        self.pixmap.draw_pixmap(
            0,
            0,
            overlay,
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Pack pixels as `0x00RRGGBB`, row-major, for window presentation
    pub fn write_xrgb(&self, out: &mut [u32]) {
        for (dst, px) in out.iter_mut().zip(self.pixmap.pixels()) {
            *dst = (px.red() as u32) << 16 | (px.green() as u32) << 8 | px.blue() as u32;
        }
    }

    /// Serialize for the encoder: little-endian rgb32 (`B, G, R, 0xFF`),
    /// column-major (x outer, y inner).
    pub fn write_export(&self, out: &mut Vec<u8>) {
        let width = self.width() as usize;
        let height = self.height() as usize;
        let pixels = self.pixmap.pixels();

        out.clear();
        out.reserve(width * height * EXPORT_BYTES_PER_PIXEL);
        for x in 0..width {
            for y in 0..height {
                let px = pixels[y * width + x];
                out.extend_from_slice(&[px.blue(), px.green(), px.red(), 0xFF]);
            }
        }
    }
}

fn blend_channel(dst: u8, goal: u8, alpha: u8) -> u8 {
    let dst = dst as u32;
    let goal = goal as u32;
    let alpha = alpha as u32;
    let mixed = dst * (255 - alpha) + goal * alpha;
    if goal <= dst {
        // Floor moves down toward goal
        (mixed / 255) as u8
    } else {
        mixed.div_ceil(255) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{DOT1, Rgb};

    fn solid_sprite(color: Rgb, size: u32) -> Pixmap {
        let mut sprite = Pixmap::new(size, size).unwrap();
        sprite.fill(color.to_color());
        sprite
    }

    #[test]
    fn test_new_frame_is_black() {
        let frame = DisplayFrame::new(8, 4).unwrap();
        assert_eq!(frame.width(), 8);
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.pixel(7, 3), Some(BLACK));
        assert_eq!(frame.pixel(8, 0), None);
        assert!(DisplayFrame::new(0, 4).is_none());
    }

    #[test]
    fn test_blend_channel_rounds_toward_goal() {
        assert_eq!(blend_channel(1, 0, 128), 0);
        assert_eq!(blend_channel(255, 0, 128), 127);
        assert_eq!(blend_channel(0, 255, 128), 128);
        assert_eq!(blend_channel(254, 255, 1), 255);
        assert_eq!(blend_channel(9, 9, 200), 9);
    }

    #[test]
    fn test_blend_rect_is_clipped() {
        let mut frame = DisplayFrame::new(4, 4).unwrap();
        frame.blend_rect(-10, -10, 12, 12, Rgb::new(255, 255, 255), 255);
        assert_eq!(frame.pixel(0, 0), Some(Rgb::new(255, 255, 255)));
        assert_eq!(frame.pixel(1, 1), Some(Rgb::new(255, 255, 255)));
        assert_eq!(frame.pixel(2, 2), Some(BLACK));

        // Entirely outside: no-op, no panic
        frame.blend_rect(100, 100, 5, 5, Rgb::new(255, 255, 255), 255);
        frame.blend_rect(-100, 0, 5, 5, Rgb::new(255, 255, 255), 255);
    }

    #[test]
    fn test_blit_additive_saturates() {
        let mut frame = DisplayFrame::new(4, 4).unwrap();
        let sprite = solid_sprite(DOT1, 1);
        for _ in 0..50 {
            frame.blit_additive(sprite.as_ref(), 1, 1, 1.0);
        }
        assert_eq!(frame.pixel(1, 1), Some(Rgb::new(255, 255, 255)));
        assert_eq!(frame.pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn test_blit_additive_off_canvas() {
        let mut frame = DisplayFrame::new(4, 4).unwrap();
        let sprite = solid_sprite(DOT1, 3);
        frame.blit_additive(sprite.as_ref(), -2, -2, 1.0);
        frame.blit_additive(sprite.as_ref(), 3, 3, 1.0);
        frame.blit_additive(sprite.as_ref(), 5000, -5000, 1.0);
        assert_eq!(frame.pixel(0, 0), Some(DOT1));
        assert_eq!(frame.pixel(3, 3), Some(DOT1));
        assert_eq!(frame.pixel(1, 1), Some(BLACK));
        assert_eq!(frame.pixel(0, 1), Some(BLACK));
        assert_eq!(frame.pixel(1, 0), Some(BLACK));
    }

    fn lit_pixels(frame: &DisplayFrame) -> Vec<(u32, u32)> {
        let mut lit = Vec::new();
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if frame.pixel(x, y) != Some(BLACK) {
                    lit.push((x, y));
                }
            }
        }
        lit
    }

    #[test]
    fn test_blit_additive_fully_outside_is_noop() {
        let sprite = solid_sprite(DOT1, 3);
        for (x, y) in [(-3, 1), (1, -3), (4, 0), (0, 4), (-3, -3)] {
            let mut frame = DisplayFrame::new(4, 4).unwrap();
            frame.blit_additive(sprite.as_ref(), x, y, 1.0);
            assert!(lit_pixels(&frame).is_empty(), "blit at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_blit_additive_clips_top_and_left_rows() {
        let sprite = solid_sprite(DOT1, 3);

        let mut frame = DisplayFrame::new(4, 4).unwrap();
        frame.blit_additive(sprite.as_ref(), 2, -1, 1.0);
        assert_eq!(lit_pixels(&frame), [(2, 0), (3, 0), (2, 1), (3, 1)]);

        let mut frame = DisplayFrame::new(4, 4).unwrap();
        frame.blit_additive(sprite.as_ref(), -2, 1, 1.0);
        assert_eq!(lit_pixels(&frame), [(0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn test_blit_additive_opacity() {
        let mut frame = DisplayFrame::new(2, 2).unwrap();
        let sprite = solid_sprite(Rgb::new(200, 100, 0), 1);
        frame.blit_additive(sprite.as_ref(), 0, 0, 0.0);
        assert_eq!(frame.pixel(0, 0), Some(BLACK));

        frame.blit_additive(sprite.as_ref(), 0, 0, 0.5);
        assert_eq!(frame.pixel(0, 0), Some(Rgb::new(100, 50, 0)));
    }

    #[test]
    fn test_write_xrgb() {
        let mut frame = DisplayFrame::new(2, 1).unwrap();
        frame.blend_rect(1, 0, 1, 1, Rgb::new(0x12, 0x34, 0x56), 255);
        let mut out = [0u32; 2];
        frame.write_xrgb(&mut out);
        assert_eq!(out, [0, 0x00123456]);
    }

    #[test]
    fn test_write_export_is_column_major_bgra() {
        let mut frame = DisplayFrame::new(2, 2).unwrap();
        // Mark (1, 0): second column, first row
        frame.blend_rect(1, 0, 1, 1, Rgb::new(10, 20, 30), 255);

        let mut out = Vec::new();
        frame.write_export(&mut out);
        assert_eq!(out.len(), 2 * 2 * EXPORT_BYTES_PER_PIXEL);
        // Column 0 comes first (two pixels), then column 1 starting at (1, 0)
        assert_eq!(&out[0..4], &[0, 0, 0, 0xFF]);
        assert_eq!(&out[8..12], &[30, 20, 10, 0xFF]);
    }
}
