//! Raw video export
//!
//! Frames are piped headerless to an `ffmpeg` child process as rgb32, one
//! frame per tick, in presentation order.

use crate::config::ExportConfig;
use crate::scope::DisplayFrame;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to start encoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Encoder pipe closed: {0}")]
    Pipe(#[from] std::io::Error),
    #[error("Encoder exited with {0}")]
    Encoder(ExitStatus),
    #[error("Export already finished")]
    Finished,
}

/// Destination for composited frames
pub trait ExportSink {
    fn write_frame(&mut self, frame: &DisplayFrame) -> Result<(), ExportError>;

    /// Flush and close the stream; called once after the last frame
    fn finish(&mut self) -> Result<(), ExportError>;
}

/// Build the encoder command line for `width` x `height` frames at `fps`
pub fn encoder_command(config: &ExportConfig, width: u32, height: u32, fps: u32) -> Command {
    let mut cmd = Command::new(&config.ffmpeg);
    cmd.args(["-y", "-f", "rawvideo", "-vcodec", "rawvideo"])
        .arg("-s")
        .arg(format!("{}x{}", width, height))
        .args(["-pix_fmt", "rgb32"])
        .arg("-r")
        .arg(fps.to_string())
        .args(["-i", "-", "-an"])
        .arg("-b:v")
        .arg(&config.bitrate)
        .args(["-q", "2"])
        .arg(&config.output);
    cmd
}

pub struct FfmpegExport {
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    frames: u64,
}

impl FfmpegExport {
    pub fn spawn(
        config: &ExportConfig,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, ExportError> {
        let mut cmd = encoder_command(config, width, height, fps);
        cmd.stdin(Stdio::piped()).stdout(Stdio::null());

        let program = cmd.get_program().to_string_lossy().to_string();
        debug!("Spawning encoder: {:?}", cmd);
        let mut child = cmd
            .spawn()
            .map_err(|source| ExportError::Spawn { program, source })?;
        let stdin = child.stdin.take();

        info!(
            "Exporting {}x{} @ {} fps to {}",
            width,
            height,
            fps,
            config.output.display()
        );

        Ok(Self {
            child,
            stdin,
            scratch: Vec::new(),
            frames: 0,
        })
    }
}

impl ExportSink for FfmpegExport {
    fn write_frame(&mut self, frame: &DisplayFrame) -> Result<(), ExportError> {
        let stdin = self.stdin.as_mut().ok_or(ExportError::Finished)?;
        frame.write_export(&mut self.scratch);
        stdin.write_all(&self.scratch)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        // Dropping stdin sends EOF so the encoder can write its trailer
        if let Some(mut stdin) = self.stdin.take() {
            // A dead pipe here is reported through the exit status below
            if let Err(e) = stdin.flush() {
                debug!("Flushing encoder input failed: {}", e);
            }
        }

        let status = self.child.wait()?;
        if !status.success() {
            return Err(ExportError::Encoder(status));
        }

        info!("Export finished: {} frames", self.frames);
        Ok(())
    }
}

impl Drop for FfmpegExport {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
