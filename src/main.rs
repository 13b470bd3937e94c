mod audio;
mod colors;
mod config;
mod display;
mod export;
mod scheduler;
mod scope;

use crate::audio::{CpalPlayback, PlaybackSink, REFERENCE_BITS, SampleSource, WavSource};
use crate::config::{
    APP_TITLE, DEFAULT_INPUT, DEFAULT_OUTPUT, DOT_ALPHA, ExportConfig, FADE_ALPHA, FFMPEG_BIN,
    SUBFRAMES, ScopeConfig,
};
use crate::display::{InterruptFlag, Interruptible, WindowPresenter};
use crate::export::{ExportSink, FfmpegExport};
use crate::scheduler::{EngineState, FramePacer, Outputs, Scheduler, StopReason};
use anyhow::{Context, Result, anyhow};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

const DOWNLOAD_HINT: &str = "http://luis.net/projects/scope/beams_4ch.wav";

/// Input missing, unreadable or in an unsupported format
const EXIT_SOURCE: u8 = 1;
/// Any later failure: settings, window, encoder, or a lost display
const EXIT_FAILURE: u8 = 3;

#[derive(Parser)]
#[command(name = "xyscope")]
#[command(about = "Oscilloscope X-Y mode emulator: draws a stereo WAV file as a phosphor trace")]
#[command(version = "0.1.0")]
struct Cli {
    /// WAV file to draw (stereo, or 4 channels with the monitor mix on 3/4)
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    ifile: PathBuf,

    /// Draw the graticule
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    grid: bool,

    /// Play the audio while drawing
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = true
    )]
    listen: bool,

    /// Pipe every frame to ffmpeg
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    export: bool,

    /// Video file written when exporting
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Encoder binary
    #[arg(long, default_value = FFMPEG_BIN)]
    ffmpeg: PathBuf,

    /// Fade alpha per sub-frame (lower = longer tail)
    #[arg(long, default_value_t = FADE_ALPHA)]
    fade: u8,

    /// Global alpha of each dot stamp
    #[arg(long, default_value_t = DOT_ALPHA)]
    dot_alpha: u8,

    /// Chunks composited per displayed frame
    #[arg(long, default_value_t = SUBFRAMES, value_parser = clap::value_parser!(u32).range(1..))]
    subframes: u32,
}

impl Cli {
    fn scope_config(&self) -> ScopeConfig {
        ScopeConfig {
            subframes: self.subframes,
            fade_alpha: self.fade,
            dot_alpha: self.dot_alpha,
            show_grid: self.grid,
            listen: self.listen,
            export: self.export.then(|| ExportConfig {
                ffmpeg: self.ffmpeg.clone(),
                output: self.output.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn open_source(cli: &Cli) -> Option<WavSource<std::io::BufReader<std::fs::File>>> {
    let opened = WavSource::open(&cli.ifile).and_then(|source| {
        source.spec().layout()?;
        Ok(source)
    });

    match opened {
        Ok(source) => Some(source),
        Err(e) => {
            error!("{}", e);
            eprintln!("\nCould not open the WAV file.");
            eprintln!("For example, you can download beams_4ch.wav from:");
            eprintln!("{}\n", DOWNLOAD_HINT);
            None
        }
    }
}

/// Returns the process exit status
fn run(cli: &Cli) -> Result<u8> {
    let Some(source) = open_source(cli) else {
        return Ok(EXIT_SOURCE);
    };

    let spec = source.spec();
    let layout = spec.layout()?;
    let mut config = cli.scope_config();

    info!("{}", APP_TITLE);
    info!("Input           : {}", cli.ifile.display());
    info!("Sampling rate   : {} Hz", spec.sample_rate);
    info!("Samples/frame   : {}", config.read_length(spec.sample_rate));
    info!("Channels        : {}", spec.channels);
    info!("Sample width    : {} bytes", spec.bytes_per_sample());
    info!(
        "Length          : {:.1}s",
        source.total_frames() as f64 / spec.sample_rate.max(1) as f64
    );
    if spec.bits_per_sample != REFERENCE_BITS {
        warn!(
            "{}-bit input; the trace is tuned for {}-bit audio",
            spec.bits_per_sample, REFERENCE_BITS
        );
    }

    let mut export = match &config.export {
        Some(export_config) => {
            match FfmpegExport::spawn(export_config, config.width, config.height, config.fps) {
                Ok(export) => Some(export),
                Err(e) => {
                    error!("Video export disabled: {}", e);
                    None
                }
            }
        }
        None => None,
    };
    if export.is_none() {
        config.export = None;
    }

    let engine = EngineState::new(spec, layout, &config, FramePacer::new(config.fps))
        .context("Invalid scope settings")?;

    let interrupt = InterruptFlag::install().unwrap_or_else(|e| {
        warn!("Ctrl-C will not stop cleanly: {}", e);
        InterruptFlag::default()
    });

    let (width, height) = engine.frame_size();
    let window = WindowPresenter::open(APP_TITLE, width, height)
        .map_err(|e| anyhow!("Failed to open the display: {}", e))?;
    let mut presenter = Interruptible::new(window, interrupt);

    let mut playback = if config.listen {
        info!("Loading sound: {}", cli.ifile.display());
        match CpalPlayback::open(spec, engine.frames_per_tick()) {
            Ok(playback) => Some(playback),
            Err(e) => {
                warn!("Audio monitor unavailable, continuing without sound: {}", e);
                None
            }
        }
    } else {
        None
    };

    let report = Scheduler::new(source, engine).run(Outputs {
        presenter: &mut presenter,
        playback: playback.as_mut().map(|p| p as &mut dyn PlaybackSink),
        export: export.as_mut().map(|e| e as &mut dyn ExportSink),
    });

    if report.export_error.is_none() {
        if let Some(export) = export.as_mut() {
            export.finish().context("Video export did not complete")?;
        }
    }

    Ok(exit_code(report.stop_reason))
}

fn exit_code(reason: StopReason) -> u8 {
    match reason {
        StopReason::DisplayLost => EXIT_FAILURE,
        StopReason::Exhausted | StopReason::Truncated | StopReason::Quit => 0,
    }
}
