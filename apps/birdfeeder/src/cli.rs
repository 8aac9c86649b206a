//! # CLI Module
//!
//! Command line flags and their validation into a [`FeederConfig`].
//!
//! Flag names follow the earlier feeder script where one existed
//! (`--rtspURL`, `--pushoveruserkey`, `--pushoverapitoken` are accepted as
//! aliases). Pushover secrets can also come from the environment.

use crate::error::AppError;
use crate::notify::PushoverCredentials;
use crate::source::{PipeOptions, SourceConfig};
use birdfeeder_core::policy::{DEFAULT_ALERT_PERIOD, DEFAULT_SAVE_PERIOD};
use birdfeeder_core::{LabelMap, ModelSpec, PolicyConfig, Score};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Smart birdfeeder: classify camera frames on an Edge TPU, save the birds,
/// skip the patio.
#[derive(Parser, Debug, Clone)]
#[command(name = "birdfeeder", author, version, about, long_about = None)]
pub struct Cli {
    /// Model file, optionally with an Edge TPU device: `birds.tflite@usb:0`
    #[arg(long)]
    pub model: ModelSpec,

    /// Label file (`<id> <label>` per line)
    #[arg(long)]
    pub labels: PathBuf,

    /// Directory for captures and results.log
    #[arg(long)]
    pub storage: PathBuf,

    /// Number of highest scoring classes to keep per frame
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    /// Class score threshold; lower scores are discarded
    #[arg(long, default_value = "0.1")]
    pub threshold: Score,

    /// Print inference results to the terminal
    #[arg(long)]
    pub print: bool,

    /// Training mode: save frames whenever the label set changes
    #[arg(long)]
    pub training: bool,

    /// RTSP URL of an external camera
    #[arg(long, alias = "rtspURL", conflicts_with = "source_dir")]
    pub rtsp_url: Option<String>,

    /// Local camera device, used when no RTSP URL is given
    #[arg(long, default_value = "/dev/video0")]
    pub device: PathBuf,

    /// Replay JPEG files from a directory instead of a camera
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Delay between replayed frames, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub replay_interval_ms: u64,

    /// Frames per second requested from the camera
    #[arg(long, default_value_t = 5)]
    pub frame_rate: u32,

    /// ffmpeg executable used to read the camera
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// Wait before restarting a lost video stream, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub reconnect_delay_ms: u64,

    /// Consecutive stream restarts before giving up
    #[arg(long, default_value_t = 10)]
    pub max_restarts: u32,

    /// Restart the video stream after this long without data, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub stall_timeout_ms: u64,

    /// Pushover user key for notifications
    #[arg(long, alias = "pushoveruserkey", env = "PUSHOVER_USER_KEY", hide_env_values = true)]
    pub pushover_user_key: Option<String>,

    /// Pushover API token for notifications
    #[arg(long, alias = "pushoverapitoken", env = "PUSHOVER_API_TOKEN", hide_env_values = true)]
    pub pushover_api_token: Option<String>,

    /// Classification backend base URL
    #[arg(long, env = "BIRDFEEDER_INFERENCE_URL", default_value = "http://127.0.0.1:8501")]
    pub inference_url: String,

    /// Serve /health and /status on this address
    #[arg(long)]
    pub status_addr: Option<SocketAddr>,

    /// Label that never counts as a detection (repeatable; replaces the defaults)
    #[arg(long = "ignore-label", value_name = "LABEL")]
    pub ignore_labels: Vec<String>,

    /// Top score needed to print results
    #[arg(long, default_value = "0.65")]
    pub print_threshold: Score,

    /// Top score needed to save a frame and alert
    #[arg(long, default_value = "0.70")]
    pub capture_threshold: Score,

    /// Minimum seconds between saved frames
    #[arg(long, default_value_t = DEFAULT_SAVE_PERIOD.as_secs())]
    pub save_every_secs: u64,

    /// Minimum seconds between alerts
    #[arg(long, default_value_t = DEFAULT_ALERT_PERIOD.as_secs())]
    pub alert_every_secs: u64,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    pub check: bool,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct FeederConfig {
    pub model: ModelSpec,
    pub labels: LabelMap,
    pub storage: PathBuf,
    pub threshold: Score,
    pub top_k: usize,
    pub policy: PolicyConfig,
    pub source: SourceConfig,
    pub pipe: PipeOptions,
    pub inference_url: String,
    pub pushover: Option<PushoverCredentials>,
    pub status_addr: Option<SocketAddr>,
}

impl Cli {
    /// Validate flags and load the label file.
    pub fn into_config(self) -> Result<FeederConfig, AppError> {
        if self.top_k == 0 {
            return Err(AppError::Config(String::from("--top-k must be at least 1")));
        }
        if self.print_threshold < self.threshold || self.capture_threshold < self.threshold {
            warn!(
                threshold = %self.threshold,
                "print/capture threshold below class threshold; the class threshold wins"
            );
        }

        let labels = LabelMap::load(&self.labels)?;

        let pushover = match (self.pushover_user_key, self.pushover_api_token) {
            (Some(user_key), Some(api_token)) => Some(PushoverCredentials {
                user_key,
                api_token,
            }),
            (None, None) => None,
            _ => {
                warn!("only one of the Pushover user key / API token is set; alerts disabled");
                None
            }
        };

        let ignored_labels = if self.ignore_labels.is_empty() {
            PolicyConfig::default_ignored()
        } else {
            self.ignore_labels.into_iter().collect()
        };

        let policy = PolicyConfig {
            ignored_labels,
            print_threshold: self.print_threshold,
            capture_threshold: self.capture_threshold,
            save_period: Duration::from_secs(self.save_every_secs),
            alert_period: Duration::from_secs(self.alert_every_secs),
            print: self.print,
            training: self.training,
            alerts_enabled: pushover.is_some(),
            top_k: self.top_k,
        };

        let source = match (self.source_dir, self.rtsp_url) {
            (Some(dir), _) => SourceConfig::Directory {
                dir,
                interval: Duration::from_millis(self.replay_interval_ms),
            },
            (None, Some(url)) => SourceConfig::Rtsp { url },
            (None, None) => SourceConfig::Device { path: self.device },
        };

        let pipe = PipeOptions {
            ffmpeg: self.ffmpeg,
            frame_rate: self.frame_rate,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_restarts: self.max_restarts,
            stall_timeout: Duration::from_millis(self.stall_timeout_ms),
        };

        Ok(FeederConfig {
            model: self.model,
            labels,
            storage: self.storage,
            threshold: self.threshold,
            top_k: self.top_k,
            policy,
            source,
            pipe,
            inference_url: self.inference_url,
            pushover,
            status_addr: self.status_addr,
        })
    }
}

impl FeederConfig {
    /// Human readable summary for `--check` and the startup log.
    #[must_use]
    pub fn summary(&self) -> String {
        let source = match &self.source {
            SourceConfig::Rtsp { url } => format!("rtsp {url}"),
            SourceConfig::Device { path } => format!("device {}", path.display()),
            SourceConfig::Directory { dir, .. } => format!("directory {}", dir.display()),
        };
        let ignored: Vec<&str> = self
            .policy
            .ignored_labels
            .iter()
            .map(String::as_str)
            .collect();

        let mut out = String::new();
        out.push_str(&format!("model:      {}\n", self.model));
        out.push_str(&format!("labels:     {} entries\n", self.labels.len()));
        out.push_str(&format!("storage:    {}\n", self.storage.display()));
        out.push_str(&format!("source:     {source}\n"));
        out.push_str(&format!("inference:  {}\n", self.inference_url));
        out.push_str(&format!(
            "ranking:    top {} above {}\n",
            self.top_k, self.threshold
        ));
        out.push_str(&format!(
            "print:      {} (above {})\n",
            self.policy.print, self.policy.print_threshold
        ));
        out.push_str(&format!(
            "capture:    above {} every {}s\n",
            self.policy.capture_threshold,
            self.policy.save_period.as_secs()
        ));
        out.push_str(&format!(
            "alerts:     {} every {}s\n",
            if self.pushover.is_some() { "pushover" } else { "off" },
            self.policy.alert_period.as_secs()
        ));
        out.push_str(&format!("training:   {}\n", self.policy.training));
        out.push_str(&format!("ignored:    {}\n", ignored.join(" | ")));
        if let Some(addr) = self.status_addr {
            out.push_str(&format!("status:     http://{addr}\n"));
        }
        out
    }
}
