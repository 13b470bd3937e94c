//! Real-time monitor output
//!
//! The scheduler hands over one tick's worth of PCM bytes; the device pulls
//! from a ring buffer on its own thread. Underflow is filled with silence.

use super::{AudioError, PcmSpec};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Playback always uses a stereo pair
pub const MONITOR_CHANNELS: u16 = 2;

/// Ring buffer depth in video frames' worth of audio
const BUFFERED_TICKS: usize = 4;

const BACKOFF: Duration = Duration::from_millis(1);

/// Destination for the monitored audio of each tick
pub trait PlaybackSink {
    /// Queue one tick of interleaved little-endian PCM (sample width x channels per frame)
    fn write(&mut self, pcm: &[u8]);

    /// Give queued audio a chance to play out before shutdown
    fn drain(&mut self) {}

    /// Stop output immediately
    fn stop(&mut self) {}
}

pub struct CpalPlayback {
    producer: HeapProd<f32>,
    stream: cpal::Stream,
    spec: PcmSpec,
    scratch: Vec<f32>,
    latency: Duration,
    dropped: usize,
}

impl CpalPlayback {
    /// Open the default output device at the source rate.
    ///
    /// `frames_per_tick` sizes the ring buffer; writes block for at most the
    /// resulting buffer latency before excess samples are dropped.
    pub fn open(spec: PcmSpec, frames_per_tick: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let supported = device.default_output_config()?;
        let config = StreamConfig {
            channels: MONITOR_CHANNELS,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = (frames_per_tick * BUFFERED_TICKS).max(1) * MONITOR_CHANNELS as usize;
        let ring = HeapRb::<f32>::new(capacity);
        let (producer, consumer) = ring.split();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, consumer)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, consumer)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, consumer)?,
            cpal::SampleFormat::I32 => Self::build_stream::<i32>(&device, &config, consumer)?,
            other => {
                return Err(AudioError::Unsupported(format!(
                    "output device sample format {:?}",
                    other
                )));
            }
        };
        stream.play()?;

        let latency = Duration::from_secs_f64(
            (capacity / MONITOR_CHANNELS as usize) as f64 / spec.sample_rate.max(1) as f64,
        );

        info!(
            "Audio monitor: {} Hz, {} channels, {:.0}ms buffer",
            spec.sample_rate,
            MONITOR_CHANNELS,
            latency.as_secs_f64() * 1000.0
        );

        Ok(Self {
            producer,
            stream,
            spec,
            scratch: Vec::with_capacity(capacity),
            latency,
            dropped: 0,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut consumer: HeapCons<f32>,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
    {
        let mut temp_buffer: Vec<f32> = vec![0.0; 4096];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if temp_buffer.len() < data.len() {
                    temp_buffer.resize(data.len(), 0.0);
                }
                let popped = consumer.pop_slice(&mut temp_buffer[..data.len()]);
                for (out, &sample) in data.iter_mut().zip(&temp_buffer[..popped]) {
                    *out = <T as cpal::Sample>::from_sample(sample);
                }
                // Underflow: pad with silence
                for out in &mut data[popped..] {
                    *out = <T as cpal::Sample>::EQUILIBRIUM;
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }
}

impl PlaybackSink for CpalPlayback {
    fn write(&mut self, pcm: &[u8]) {
        self.scratch.clear();
        self.scratch.extend(self.spec.decode_samples(pcm));

        let deadline = Instant::now() + self.latency;
        let mut remaining = &self.scratch[..];
        while !remaining.is_empty() {
            let pushed = self.producer.push_slice(remaining);
            remaining = &remaining[pushed..];
            if remaining.is_empty() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(BACKOFF);
        }

        if !remaining.is_empty() {
            self.dropped += remaining.len();
            debug!("Audio buffer overflow: dropped {} samples", remaining.len());
        }
    }

    fn drain(&mut self) {
        let deadline = Instant::now() + self.latency;
        while self.producer.occupied_len() > 0 && Instant::now() < deadline {
            std::thread::sleep(BACKOFF);
        }
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause audio stream: {}", e);
        }
        if self.dropped > 0 {
            info!("Audio monitor dropped {} samples", self.dropped);
        }
    }
}
