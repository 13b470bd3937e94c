//! Phosphor persistence model
//!
//! Every sub-frame darkens the whole screen toward black by a fixed fraction,
//! redraws the graticule on top, then adds one glyph per mapped sample pair.
//! Old dots are never erased, only faded.

use super::{Coordinate, DisplayFrame, DotGlyph, GridOverlay, Orientation};
use crate::colors::BLACK;
use crate::config::{ConfigError, ScopeConfig};

pub struct Compositor {
    frame: DisplayFrame,
    glyph: DotGlyph,
    grid: Option<GridOverlay>,
    fade_alpha: u8,
}

impl Compositor {
    pub fn new(config: &ScopeConfig) -> Result<Self, ConfigError> {
        let empty = || ConfigError::EmptyDisplay {
            width: config.width,
            height: config.height,
        };

        // Exported frames are serialized column-major, so the buffer is
        // allocated with swapped dimensions to match the transposed coordinates
        let (width, height) = match config.orientation() {
            Orientation::Screen => (config.width, config.height),
            Orientation::Export => (config.height, config.width),
        };

        let frame = DisplayFrame::new(width, height).ok_or_else(empty)?;
        let glyph = DotGlyph::new(config.dot_alpha).ok_or_else(empty)?;
        let grid = if config.show_grid {
            Some(GridOverlay::new(width, height).ok_or_else(empty)?)
        } else {
            None
        };

        Ok(Self {
            frame,
            glyph,
            grid,
            fade_alpha: config.fade_alpha,
        })
    }

    /// Fade the previous contents and lay the graticule back on top
    pub fn begin_subframe(&mut self) {
        let (width, height) = (self.frame.width(), self.frame.height());
        self.frame
            .blend_rect(0, 0, width, height, BLACK, self.fade_alpha);
        if let Some(grid) = &self.grid {
            self.frame.overlay(grid.overlay());
        }
    }

    /// Add one glyph centered on `at`. Off-canvas parts are clipped.
    pub fn stamp(&mut self, at: Coordinate) {
        let radius = self.glyph.radius();
        self.frame.blit_additive(
            self.glyph.sprite(),
            at.x - radius,
            at.y - radius,
            self.glyph.opacity(),
        );
    }

    pub fn frame(&self) -> &DisplayFrame {
        &self.frame
    }
}
