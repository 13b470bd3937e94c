//! Sequential PCM sample source
//!
//! The scheduler pulls fixed-size chunks of interleaved frames until the
//! source reports [`Pull::EndOfStream`]. Sources are never rewound.

use super::{AudioError, PcmSpec};
use hound::WavReader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Result of a single pull
#[derive(Debug)]
pub enum Pull {
    Chunk(SampleChunk),
    EndOfStream,
}

/// Interleaved frames read in one pull. Only whole frames are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleChunk {
    samples: Vec<i32>,
    channels: usize,
}

impl SampleChunk {
    pub fn new(mut samples: Vec<i32>, channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        samples.truncate(samples.len() - samples.len() % channels);
        Self { samples, channels }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter_frames(&self) -> std::slice::ChunksExact<'_, i32> {
        self.samples.chunks_exact(self.channels)
    }
}

/// A finite, pull-based stream of PCM frames
pub trait SampleSource {
    fn spec(&self) -> PcmSpec;

    /// Read up to `frames` frames. A chunk shorter than requested means the
    /// stream ended mid-chunk; the next pull returns `EndOfStream`.
    fn pull(&mut self, frames: usize) -> Result<Pull, AudioError>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn spec(&self) -> PcmSpec {
        (**self).spec()
    }

    fn pull(&mut self, frames: usize) -> Result<Pull, AudioError> {
        (**self).pull(frames)
    }
}

/// WAV file reader backed by hound
pub struct WavSource<R: Read> {
    reader: WavReader<R>,
    spec: PcmSpec,
}

impl WavSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AudioError::Open {
            path: path.display().to_string(),
            source: hound::Error::IoError(e),
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> WavSource<R> {
    pub fn new(reader: R) -> Result<Self, AudioError> {
        let reader = WavReader::new(reader)?;
        let wav_spec = reader.spec();
        if wav_spec.sample_format != hound::SampleFormat::Int {
            return Err(AudioError::Unsupported(
                "floating point samples".to_string(),
            ));
        }

        let spec = PcmSpec::new(
            wav_spec.sample_rate,
            wav_spec.channels,
            wav_spec.bits_per_sample,
        )?;

        Ok(Self { reader, spec })
    }

    /// Total length of the stream in frames
    pub fn total_frames(&self) -> u32 {
        self.reader.duration()
    }
}

impl<R: Read> SampleSource for WavSource<R> {
    fn spec(&self) -> PcmSpec {
        self.spec
    }

    fn pull(&mut self, frames: usize) -> Result<Pull, AudioError> {
        let wanted = frames * self.spec.channels as usize;
        let mut samples = Vec::with_capacity(wanted);

        for sample in self.reader.samples::<i32>().take(wanted) {
            samples.push(sample?);
        }

        let chunk = SampleChunk::new(samples, self.spec.channels);
        if chunk.is_empty() {
            Ok(Pull::EndOfStream)
        } else {
            Ok(Pull::Chunk(chunk))
        }
    }
}

/// In-memory source for exercising the scheduler without files
#[cfg(test)]
pub struct MemorySource {
    spec: PcmSpec,
    samples: Vec<i32>,
    position: usize,
    pub pulls: usize,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(spec: PcmSpec, samples: Vec<i32>) -> Self {
        Self {
            spec,
            samples,
            position: 0,
            pulls: 0,
        }
    }

    pub fn silent(spec: PcmSpec, frames: usize) -> Self {
        Self::new(spec, vec![0; frames * spec.channels as usize])
    }
}

#[cfg(test)]
impl SampleSource for MemorySource {
    fn spec(&self) -> PcmSpec {
        self.spec
    }

    fn pull(&mut self, frames: usize) -> Result<Pull, AudioError> {
        self.pulls += 1;
        let wanted = frames * self.spec.channels as usize;
        let end = (self.position + wanted).min(self.samples.len());
        let chunk = SampleChunk::new(self.samples[self.position..end].to_vec(), self.spec.channels);
        self.position = end;
        if chunk.is_empty() {
            Ok(Pull::EndOfStream)
        } else {
            Ok(Pull::Chunk(chunk))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::io::Cursor;

    fn wav_bytes(channels: u16, bits: u16, samples: &[i32]) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                match bits {
                    8 => writer.write_sample(sample as i8).unwrap(),
                    16 => writer.write_sample(sample as i16).unwrap(),
                    _ => writer.write_sample(sample).unwrap(),
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_chunk_drops_partial_frame() {
        let chunk = SampleChunk::new(vec![1, 2, 3, 4, 5], 2);
        assert_eq!(chunk.frames(), 2);
        let frames: Vec<&[i32]> = chunk.iter_frames().collect();
        assert_eq!(frames, vec![&[1, 2][..], &[3, 4][..]]);
    }

    #[test]
    fn test_wav_source_reads_spec() {
        let bytes = wav_bytes(2, 16, &[0, 0, 1, -1]);
        let source = WavSource::new(Cursor::new(bytes)).unwrap();
        let spec = source.spec();
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(source.total_frames(), 2);
    }

    #[test]
    fn test_wav_source_chunks_then_ends() {
        let samples: Vec<i32> = (0..10).collect();
        let bytes = wav_bytes(2, 16, &samples);
        let mut source = WavSource::new(Cursor::new(bytes)).unwrap();

        let Pull::Chunk(first) = source.pull(3).unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(first.frames(), 3);
        assert_eq!(first.iter_frames().next().unwrap(), &[0, 1]);

        let Pull::Chunk(second) = source.pull(3).unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(second.frames(), 2);
        assert_eq!(second.iter_frames().last().unwrap(), &[8, 9]);

        assert!(matches!(source.pull(3).unwrap(), Pull::EndOfStream));
    }

    #[test]
    fn test_wav_source_decodes_signed_8_bit() {
        let bytes = wav_bytes(2, 8, &[-128, 127]);
        let mut source = WavSource::new(Cursor::new(bytes)).unwrap();
        let Pull::Chunk(chunk) = source.pull(1).unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.iter_frames().next().unwrap(), &[-128, 127]);
    }

    #[test]
    fn test_wav_source_rejects_float() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            writer.write_sample(0.5f32).unwrap();
            writer.write_sample(-0.5f32).unwrap();
            writer.finalize().unwrap();
        }
        let result = WavSource::new(Cursor::new(cursor.into_inner()));
        assert!(matches!(result, Err(AudioError::Unsupported(_))));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WavSource::open(dir.path().join("missing.wav"));
        assert!(matches!(result, Err(AudioError::Open { .. })));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beams.wav");
        std::fs::write(&path, wav_bytes(4, 16, &[1, 2, 3, 4])).unwrap();

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.spec().channels, 4);
        let Pull::Chunk(chunk) = source.pull(8).unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.frames(), 1);
    }

    #[test]
    fn test_memory_source_counts_pulls() {
        let spec = PcmSpec::new(44_100, 2, 16).unwrap();
        let mut source = MemorySource::silent(spec, 4);
        assert!(matches!(source.pull(4).unwrap(), Pull::Chunk(_)));
        assert!(matches!(source.pull(4).unwrap(), Pull::EndOfStream));
        assert_eq!(source.pulls, 2);
    }
}
