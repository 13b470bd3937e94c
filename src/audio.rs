//! Audio input and monitoring
//!
//! - `source`: pull-based PCM chunk reader (WAV via hound)
//! - `playback`: real-time monitor output (cpal + ring buffer)

mod playback;
mod source;

use thiserror::Error;

pub use playback::{CpalPlayback, MONITOR_CHANNELS, PlaybackSink};
pub use source::{Pull, SampleChunk, SampleSource, WavSource};

#[cfg(test)]
pub use source::MemorySource;

/// The only sample width the emulator was tuned against
pub const REFERENCE_BITS: u16 = 16;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Could not open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: hound::Error,
    },
    #[error("WAV decode error: {0}")]
    Decode(#[from] hound::Error),
    #[error("Unsupported sample format: {0}")]
    Unsupported(String),
    #[error("No default output device found")]
    NoOutputDevice,
    #[error("Failed to query output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Which channels drive the beam and which ones are monitored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Channels 0/1 are both plotted and played
    Stereo,
    /// Channels 0/1 are plotted, channels 2/3 are played
    Quad,
}

impl ChannelLayout {
    pub fn from_channels(channels: u16) -> Result<Self, AudioError> {
        match channels {
            2 => Ok(Self::Stereo),
            4 => Ok(Self::Quad),
            n => Err(AudioError::Unsupported(format!(
                "{} channel(s); X-Y mode needs a stereo or 4-channel beam file",
                n
            ))),
        }
    }

    /// (left, right) channel indices fed to the coordinate mapper
    pub fn beam_channels(self) -> (usize, usize) {
        (0, 1)
    }

    /// (left, right) channel indices forwarded to playback
    pub fn monitor_channels(self) -> (usize, usize) {
        match self {
            Self::Stereo => (0, 1),
            Self::Quad => (2, 3),
        }
    }
}

/// Shape of the PCM stream: all frames share these properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmSpec {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Self, AudioError> {
        if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(AudioError::Unsupported(format!(
                "{}-bit samples",
                bits_per_sample
            )));
        }
        if channels == 0 {
            return Err(AudioError::Unsupported("zero channels".to_string()));
        }
        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
        })
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// Right shift that divides a sample by its positive full-scale range.
    /// For 16-bit audio this is 15: `32767 >> 15` rounds to just under 1.0.
    pub fn full_scale_shift(&self) -> u32 {
        self.bits_per_sample as u32 - 1
    }

    pub fn layout(&self) -> Result<ChannelLayout, AudioError> {
        ChannelLayout::from_channels(self.channels)
    }

    /// Append one sample as a little-endian signed integer of the stream width
    pub fn encode_sample(&self, sample: i32, out: &mut Vec<u8>) {
        let bytes = sample.to_le_bytes();
        out.extend_from_slice(&bytes[..self.bytes_per_sample()]);
    }

    /// Decode a buffer written by [`PcmSpec::encode_sample`] into normalized floats
    pub fn decode_samples<'a>(&self, bytes: &'a [u8]) -> impl Iterator<Item = f32> + 'a {
        let width = self.bytes_per_sample();
        let bits = self.bits_per_sample as u32;
        let scale = (1u64 << (bits - 1)) as f32;
        bytes.chunks_exact(width).map(move |raw| {
            let mut buf = [0u8; 4];
            buf[..width].copy_from_slice(raw);
            // Sign-extend from the stream width
            let value = i32::from_le_bytes(buf) << (32 - bits) >> (32 - bits);
            value as f32 / scale
        })
    }
}
