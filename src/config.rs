//! Runtime configuration for the scope
//!
//! All tunables live in [`ScopeConfig`]. The defaults reproduce the classic
//! 720x720 / 30 fps emulator output; the CLI only overrides a few of them.

use std::path::PathBuf;
use thiserror::Error;

use crate::scope::Orientation;

pub const APP_TITLE: &str = "Oscilloscope X-Y Mode Emulator";

pub const WIDTH: u32 = 720;
pub const HEIGHT: u32 = 720;
pub const FPS: u32 = 30;
pub const SUBFRAMES: u32 = 1;

/// Alpha of the black rectangle laid over the screen every sub-frame.
/// Decrease for a longer tail, increase for a shorter one.
pub const FADE_ALPHA: u8 = 128;

/// Global alpha applied to each additive dot stamp.
pub const DOT_ALPHA: u8 = 255;

pub const DEFAULT_INPUT: &str = "beams_4ch.wav";
pub const DEFAULT_OUTPUT: &str = "my_output_videofile.avi";
pub const FFMPEG_BIN: &str = "ffmpeg";
pub const EXPORT_BITRATE: &str = "20M";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Display size must be non-zero (got {width}x{height})")]
    EmptyDisplay { width: u32, height: u32 },
    #[error("Frame rate must be at least 1 fps")]
    ZeroFrameRate,
    #[error("Sub-frame count must be at least 1")]
    ZeroSubframes,
    #[error("Sampling rate {sample_rate} Hz is too low for {fps} fps x {subframes} sub-frame(s)")]
    EmptyChunk {
        sample_rate: u32,
        fps: u32,
        subframes: u32,
    },
}

/// Settings for the raw video export pipe
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub ffmpeg: PathBuf,
    pub output: PathBuf,
    pub bitrate: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG_BIN),
            output: PathBuf::from(DEFAULT_OUTPUT),
            bitrate: EXPORT_BITRATE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub subframes: u32,
    pub fade_alpha: u8,
    pub dot_alpha: u8,
    pub show_grid: bool,
    pub listen: bool,
    /// `Some` when frames are piped to the encoder
    pub export: Option<ExportConfig>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            fps: FPS,
            subframes: SUBFRAMES,
            fade_alpha: FADE_ALPHA,
            dot_alpha: DOT_ALPHA,
            show_grid: false,
            listen: true,
            export: None,
        }
    }
}

impl ScopeConfig {
    /// Number of sample frames pulled per sub-frame
    pub fn read_length(&self, sample_rate: u32) -> usize {
        if self.fps == 0 || self.subframes == 0 {
            return 0;
        }
        (sample_rate / self.fps / self.subframes) as usize
    }

    /// Video output is transposed relative to the window, so exported runs
    /// plot with swapped axes.
    pub fn orientation(&self) -> Orientation {
        if self.export.is_some() {
            Orientation::Export
        } else {
            Orientation::Screen
        }
    }

    pub fn validate(&self, sample_rate: u32) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyDisplay {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.subframes == 0 {
            return Err(ConfigError::ZeroSubframes);
        }
        if self.read_length(sample_rate) == 0 {
            return Err(ConfigError::EmptyChunk {
                sample_rate,
                fps: self.fps,
                subframes: self.subframes,
            });
        }
        Ok(())
    }
}
