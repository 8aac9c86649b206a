//! # Source Module
//!
//! Where frames come from.
//!
//! - [`PipeSource`] runs ffmpeg (or any command writing concatenated JPEGs
//!   to stdout) against a local camera or an RTSP URL, and restarts it when
//!   the stream drops.
//! - [`DirectorySource`] replays `*.jpg` files, for testing a model against
//!   saved captures without a camera.

use crate::error::AppError;
use birdfeeder_core::MjpegSplitter;
use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 64 * 1024;

/// Default wait for pipe output before the stream counts as lost.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// FRAME
// =============================================================================

/// One JPEG encoded camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub captured_at: Instant,
}

impl Frame {
    #[must_use]
    pub fn new(jpeg: Vec<u8>) -> Self {
        Self {
            jpeg,
            captured_at: Instant::now(),
        }
    }
}

/// A stream of frames. `Ok(None)` means the stream ended normally.
pub trait FrameSource {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>, AppError>> + Send;
}

// =============================================================================
// SOURCE CONFIGURATION
// =============================================================================

/// Which camera input to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Network camera, e.g. a Pi Zero W serving RTSP.
    Rtsp { url: String },
    /// Local V4L2 device.
    Device { path: PathBuf },
    /// Replay JPEG files, optionally paced.
    Directory { dir: PathBuf, interval: Duration },
}

/// Pipe process tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeOptions {
    pub ffmpeg: String,
    pub frame_rate: u32,
    pub reconnect_delay: Duration,
    pub max_restarts: u32,
    /// No output for this long restarts the pipe.
    pub stall_timeout: Duration,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            ffmpeg: String::from("ffmpeg"),
            frame_rate: 5,
            reconnect_delay: Duration::from_secs(2),
            max_restarts: 10,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

// =============================================================================
// PIPE SOURCE
// =============================================================================

/// Program and arguments for a process writing JPEGs to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PipeCommand {
    /// Any command; stdout must be a concatenated JPEG stream.
    pub fn custom(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// ffmpeg reading an RTSP stream over TCP.
    #[must_use]
    pub fn rtsp(ffmpeg: &str, url: &str, frame_rate: u32) -> Self {
        let args = ["-loglevel", "error", "-rtsp_transport", "tcp", "-i", url, "-an"];
        Self::custom(ffmpeg, args).with_mjpeg_output(frame_rate)
    }

    /// ffmpeg reading a local V4L2 camera.
    #[must_use]
    pub fn device(ffmpeg: &str, device: &Path, frame_rate: u32) -> Self {
        let device = device.to_string_lossy();
        let args = ["-loglevel", "error", "-f", "v4l2", "-i", device.as_ref()];
        Self::custom(ffmpeg, args).with_mjpeg_output(frame_rate)
    }

    fn with_mjpeg_output(mut self, frame_rate: u32) -> Self {
        let rate = frame_rate.max(1).to_string();
        let output = ["-r", rate.as_str(), "-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "3", "-"];
        self.args.extend(output.iter().map(|a| (*a).to_string()));
        self
    }
}

/// Frames from a child process, restarted when its output stops.
#[derive(Debug)]
pub struct PipeSource {
    command: PipeCommand,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    splitter: MjpegSplitter,
    ready: VecDeque<Vec<u8>>,
    reconnect_delay: Duration,
    max_restarts: u32,
    stall_timeout: Duration,
    /// Consecutive restarts without a frame in between.
    failures: u32,
}

impl PipeSource {
    #[must_use]
    pub fn new(command: PipeCommand, reconnect_delay: Duration, max_restarts: u32) -> Self {
        Self {
            command,
            child: None,
            stdout: None,
            splitter: MjpegSplitter::default(),
            ready: VecDeque::new(),
            reconnect_delay,
            max_restarts,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            failures: 0,
        }
    }

    /// Restart the pipe when it writes nothing for `timeout`.
    #[must_use]
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    #[must_use]
    pub fn command(&self) -> &PipeCommand {
        &self.command
    }

    fn spawn(&mut self) -> Result<(), AppError> {
        debug!(program = %self.command.program, args = ?self.command.args, "starting frame pipe");
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::Source(format!("failed to start '{}': {e}", self.command.program))
            })?;

        self.stdout = child.stdout.take();
        self.child = Some(child);
        Ok(())
    }

    /// Tear down the current process and wait before the next attempt.
    async fn restart(&mut self, cause: &str) -> Result<(), AppError> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        self.splitter.reset();

        self.failures = self.failures.saturating_add(1);
        if self.failures > self.max_restarts {
            return Err(AppError::Source(format!(
                "stream lost ({cause}) and not recovered after {} restarts",
                self.max_restarts
            )));
        }

        warn!(
            cause,
            attempt = self.failures,
            delay_ms = self.reconnect_delay.as_millis() as u64,
            "video stream lost, restarting"
        );
        tokio::time::sleep(self.reconnect_delay).await;
        Ok(())
    }
}

impl FrameSource for PipeSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            if let Some(jpeg) = self.ready.pop_front() {
                self.failures = 0;
                return Ok(Some(Frame::new(jpeg)));
            }

            if self.stdout.is_none() {
                self.spawn()?;
            }
            let Some(stdout) = self.stdout.as_mut() else {
                self.restart("no stdout").await?;
                continue;
            };

            let read = tokio::time::timeout(self.stall_timeout, stdout.read(&mut buf)).await;
            match read {
                Ok(Ok(0)) => self.restart("end of stream").await?,
                Ok(Ok(n)) => {
                    self.ready.extend(self.splitter.push(&buf[..n]));
                }
                Ok(Err(e)) => self.restart(&e.to_string()).await?,
                Err(_) => self.restart("stalled").await?,
            }
        }
    }
}

// =============================================================================
// DIRECTORY SOURCE
// =============================================================================

/// Replays `*.jpg` / `*.jpeg` files in name order, then ends.
#[derive(Debug)]
pub struct DirectorySource {
    files: VecDeque<PathBuf>,
    interval: Duration,
    started: bool,
}

impl DirectorySource {
    pub fn open(dir: &Path, interval: Duration) -> Result<Self, AppError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_jpeg_name(path))
            .collect();
        files.sort();

        info!(dir = %dir.display(), frames = files.len(), "replaying frames from directory");
        Ok(Self {
            files: files.into(),
            interval,
            started: false,
        })
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn is_jpeg_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        if self.started && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        self.started = true;

        let jpeg = tokio::fs::read(&path).await?;
        debug!(file = %path.display(), bytes = jpeg.len(), "replayed frame");
        Ok(Some(Frame::new(jpeg)))
    }
}

// =============================================================================
// SOURCE DISPATCH
// =============================================================================

/// The source selected on the command line.
#[derive(Debug)]
pub enum SourceKind {
    Pipe(PipeSource),
    Directory(DirectorySource),
}

impl SourceKind {
    pub fn from_config(config: &SourceConfig, options: &PipeOptions) -> Result<Self, AppError> {
        let pipe = |command| {
            Self::Pipe(
                PipeSource::new(command, options.reconnect_delay, options.max_restarts)
                    .with_stall_timeout(options.stall_timeout),
            )
        };

        Ok(match config {
            SourceConfig::Rtsp { url } => {
                info!(url = %url, "using RTSP camera");
                pipe(PipeCommand::rtsp(&options.ffmpeg, url, options.frame_rate))
            }
            SourceConfig::Device { path } => {
                info!(device = %path.display(), "using local camera");
                pipe(PipeCommand::device(&options.ffmpeg, path, options.frame_rate))
            }
            SourceConfig::Directory { dir, interval } => {
                Self::Directory(DirectorySource::open(dir, *interval)?)
            }
        })
    }
}

impl FrameSource for SourceKind {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        match self {
            Self::Pipe(source) => source.next_frame().await,
            Self::Directory(source) => source.next_frame().await,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
