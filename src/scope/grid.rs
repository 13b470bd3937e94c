//! Graticule overlay
//!
//! Drawn once on a transparent pixmap and composited after the fade of every
//! sub-frame, so it stays at full intensity while the trace decays beneath it.

use super::fill_rect;
use crate::colors::GRID;
use tiny_skia::{Pixmap, PixmapRef};

const DIVISIONS: u32 = 10;
const TICK_DIVISIONS: u32 = 128;
const AXIS_WIDTH: u32 = 3;
const TICK_LENGTH: u32 = 7;

pub struct GridOverlay {
    pixmap: Pixmap,
}

impl GridOverlay {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        let center_x = width / 2;
        let center_y = height / 2;

        for k in 0..DIVISIONS {
            fill_rect(&mut pixmap, k * width / DIVISIONS, 0, 1, height, GRID);
            fill_rect(&mut pixmap, 0, k * height / DIVISIONS, width, 1, GRID);
        }

        let half_axis = AXIS_WIDTH / 2;
        fill_rect(&mut pixmap, center_x.saturating_sub(half_axis), 0, AXIS_WIDTH, height, GRID);
        fill_rect(&mut pixmap, 0, center_y.saturating_sub(half_axis), width, AXIS_WIDTH, GRID);

        // Tick marks straddle the axes; the tail past the far edge is clipped
        let half_tick = TICK_LENGTH / 2;
        for k in 0..width / 4 {
            fill_rect(
                &mut pixmap,
                k * width / TICK_DIVISIONS,
                center_y.saturating_sub(half_tick),
                1,
                TICK_LENGTH,
                GRID,
            );
            fill_rect(
                &mut pixmap,
                center_x.saturating_sub(half_tick),
                k * height / TICK_DIVISIONS,
                TICK_LENGTH,
                1,
                GRID,
            );
        }

        Some(Self { pixmap })
    }

    pub fn overlay(&self) -> PixmapRef<'_> {
        self.pixmap.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(grid: &GridOverlay, x: u32, y: u32) -> u8 {
        grid.overlay().pixel(x, y).unwrap().alpha()
    }

    #[test]
    fn test_grid_lines_and_axes() {
        let grid = GridOverlay::new(720, 720).unwrap();
        // Division lines every 72px
        assert_eq!(alpha_at(&grid, 72, 10), 255);
        assert_eq!(alpha_at(&grid, 10, 144), 255);
        // 3px center axis
        for x in 359..=361 {
            assert_eq!(alpha_at(&grid, x, 100), 255);
        }
        assert_eq!(alpha_at(&grid, 358, 100), 0);
    }

    #[test]
    fn test_background_is_transparent() {
        let grid = GridOverlay::new(720, 720).unwrap();
        assert_eq!(alpha_at(&grid, 10, 10), 0);
        assert_eq!(alpha_at(&grid, 700, 700), 0);
    }

    #[test]
    fn test_tick_marks_cross_axis() {
        let grid = GridOverlay::new(720, 720).unwrap();
        // Tick at k=1 lands on x=5, spanning y 357..=363
        assert_eq!(alpha_at(&grid, 5, 357), 255);
        assert_eq!(alpha_at(&grid, 5, 363), 255);
        assert_eq!(alpha_at(&grid, 5, 364), 0);
        assert_eq!(alpha_at(&grid, 4, 357), 0);
    }

    #[test]
    fn test_grid_color() {
        let grid = GridOverlay::new(720, 720).unwrap();
        let px = grid.overlay().pixel(0, 0).unwrap().demultiply();
        assert_eq!((px.red(), px.green(), px.blue()), (GRID.r, GRID.g, GRID.b));
    }
}
