//! Frame scheduler
//!
//! Drives one display tick per frame period:
//!
//! 1. poll the window for a quit request
//! 2. per sub-frame: fade, grid, stamp the visual subset of the chunk
//! 3. queue the chunk's monitor audio
//! 4. present, then export
//! 5. pull the next frame's chunks and sleep until the next deadline
//!
//! The loop itself never fails. Every runtime condition either is tolerated
//! or ends the run with a [`StopReason`].

mod pacer;

pub use pacer::FramePacer;

use crate::audio::{
    ChannelLayout, MONITOR_CHANNELS, PcmSpec, PlaybackSink, Pull, SampleChunk, SampleSource,
};
use crate::config::{ConfigError, ScopeConfig};
use crate::display::Presenter;
use crate::export::ExportSink;
use crate::scope::{Compositor, CoordinateMapper};
use tracing::{debug, error, info, warn};

/// One in every `VISUAL_STRIDE` frames of a chunk becomes a dot
pub const VISUAL_STRIDE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ended on a frame boundary
    Exhausted,
    /// The source ended (or failed) part way through a frame
    Truncated,
    /// The user closed the window, pressed Escape or hit Ctrl-C
    Quit,
    /// Presenting to the window failed
    DisplayLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Running,
    Draining,
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u64,
    pub stop_reason: StopReason,
    pub audio_bytes: u64,
    pub late_ticks: u64,
    /// Set when the export path failed and was dropped mid-run
    pub export_error: Option<String>,
}

/// Where a tick's results go
pub struct Outputs<'a> {
    pub presenter: &'a mut dyn Presenter,
    pub playback: Option<&'a mut dyn PlaybackSink>,
    pub export: Option<&'a mut dyn ExportSink>,
}

/// Outcome of pulling one display frame's worth of chunks
enum FramePull {
    Complete(Vec<SampleChunk>),
    Empty,
    Short,
}

/// Rendering state owned by the loop for the whole run
pub struct EngineState {
    mapper: CoordinateMapper,
    compositor: Compositor,
    pacer: FramePacer,
    layout: ChannelLayout,
    spec: PcmSpec,
    read_length: usize,
    subframes: usize,
    audio: Vec<u8>,
}

impl EngineState {
    pub fn new(
        spec: PcmSpec,
        layout: ChannelLayout,
        config: &ScopeConfig,
        pacer: FramePacer,
    ) -> Result<Self, ConfigError> {
        config.validate(spec.sample_rate)?;

        let read_length = config.read_length(spec.sample_rate);
        let subframes = config.subframes as usize;
        let audio_capacity =
            read_length * subframes * MONITOR_CHANNELS as usize * spec.bytes_per_sample();
        let mapper =
            CoordinateMapper::new(config.width, config.height, &spec, config.orientation());

        Ok(Self {
            mapper,
            compositor: Compositor::new(config)?,
            pacer,
            layout,
            spec,
            read_length,
            subframes,
            audio: Vec::with_capacity(audio_capacity),
        })
    }

    /// Size of the buffer the window has to show
    pub fn frame_size(&self) -> (u32, u32) {
        let frame = self.compositor.frame();
        (frame.width(), frame.height())
    }

    /// Sample frames consumed per display tick
    pub fn frames_per_tick(&self) -> usize {
        self.read_length * self.subframes
    }

    /// Composite every sub-frame of `chunks`, and collect the monitor audio
    /// when `collect_audio` is set.
    fn render(&mut self, chunks: &[SampleChunk], collect_audio: bool) {
        let (left, right) = self.layout.beam_channels();
        let (monitor_left, monitor_right) = self.layout.monitor_channels();
        self.audio.clear();

        for chunk in chunks {
            self.compositor.begin_subframe();
            for (k, frame) in chunk.iter_frames().enumerate() {
                if k % VISUAL_STRIDE == 0 {
                    let at = self.mapper.map(frame[left], frame[right]);
                    self.compositor.stamp(at);
                }
                if collect_audio {
                    self.spec.encode_sample(frame[monitor_left], &mut self.audio);
                    self.spec.encode_sample(frame[monitor_right], &mut self.audio);
                }
            }
        }
    }
}

pub struct Scheduler<S> {
    source: S,
    engine: EngineState,
    state: RunState,
}

impl<S: SampleSource> Scheduler<S> {
    pub fn new(source: S, engine: EngineState) -> Self {
        Self {
            source,
            engine,
            state: RunState::Starting,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("Scheduler: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn pull_frame(&mut self) -> FramePull {
        let mut chunks = Vec::with_capacity(self.engine.subframes);
        for _ in 0..self.engine.subframes {
            match self.source.pull(self.engine.read_length) {
                Ok(Pull::Chunk(chunk)) => {
                    let short = chunk.frames() < self.engine.read_length;
                    chunks.push(chunk);
                    if short {
                        break;
                    }
                }
                Ok(Pull::EndOfStream) => break,
                Err(e) => {
                    warn!("Sample source failed mid-stream: {}", e);
                    return FramePull::Short;
                }
            }
        }

        let complete = chunks.len() == self.engine.subframes
            && chunks.iter().all(|c| c.frames() == self.engine.read_length);
        if complete {
            FramePull::Complete(chunks)
        } else if chunks.is_empty() {
            FramePull::Empty
        } else {
            let frames: usize = chunks.iter().map(SampleChunk::frames).sum();
            debug!(
                "Final frame is short: {} of {} sample frames",
                frames,
                self.engine.read_length * self.engine.subframes
            );
            FramePull::Short
        }
    }

    pub fn run(mut self, mut outputs: Outputs<'_>) -> RunReport {
        let mut ticks: u64 = 0;
        let mut audio_bytes: u64 = 0;
        let mut export_error = None;

        let mut chunks = match self.pull_frame() {
            FramePull::Complete(chunks) => chunks,
            FramePull::Empty => {
                info!("Source is empty, nothing to draw");
                return self.finish(&mut outputs, StopReason::Exhausted, 0, 0, None);
            }
            FramePull::Short => {
                info!("Source is shorter than one frame, nothing to draw");
                return self.finish(&mut outputs, StopReason::Truncated, 0, 0, None);
            }
        };

        self.transition(RunState::Running);
        self.engine.pacer.start();

        let reason = loop {
            if outputs.presenter.poll_quit() {
                break StopReason::Quit;
            }

            let listening = outputs.playback.is_some();
            self.engine.render(&chunks, listening);

            if let Some(playback) = outputs.playback.as_deref_mut() {
                playback.write(&self.engine.audio);
                audio_bytes += self.engine.audio.len() as u64;
            }

            let frame = self.engine.compositor.frame();
            if let Err(e) = outputs.presenter.present(frame) {
                error!("Lost the display: {}", e);
                break StopReason::DisplayLost;
            }

            let export_failure = match outputs.export.as_deref_mut() {
                Some(export) => export.write_frame(frame).err(),
                None => None,
            };
            if let Some(e) = export_failure {
                error!("Video export failed, continuing without it: {}", e);
                export_error = Some(e.to_string());
                outputs.export = None;
            }

            ticks += 1;

            let next = self.pull_frame();
            self.engine.pacer.wait();

            match next {
                FramePull::Complete(next) => chunks = next,
                FramePull::Empty => break StopReason::Exhausted,
                FramePull::Short => break StopReason::Truncated,
            }
        };

        self.finish(&mut outputs, reason, ticks, audio_bytes, export_error)
    }

    fn finish(
        &mut self,
        outputs: &mut Outputs<'_>,
        reason: StopReason,
        ticks: u64,
        audio_bytes: u64,
        export_error: Option<String>,
    ) -> RunReport {
        let drain = matches!(reason, StopReason::Exhausted | StopReason::Truncated);
        if drain {
            self.transition(RunState::Draining);
        }
        if let Some(playback) = outputs.playback.as_deref_mut() {
            if drain {
                playback.drain();
            }
            playback.stop();
        }
        self.transition(RunState::Stopped(reason));

        let report = RunReport {
            ticks,
            stop_reason: reason,
            audio_bytes,
            late_ticks: self.engine.pacer.late_ticks(),
            export_error,
        };
        info!(
            "Stopped ({:?}) after {} frames, {} late, {} audio bytes",
            report.stop_reason, report.ticks, report.late_ticks, report.audio_bytes
        );
        report
    }
}
