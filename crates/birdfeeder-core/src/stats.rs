//! # Stats Module
//!
//! Running counters and the terminal debug report.

use crate::classification::{Class, Classification};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters for one feeder run. Served by the status endpoint and logged
/// on shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederStats {
    /// Frames pulled from the source.
    pub frames: u64,
    /// Frames whose top class passed the capture threshold.
    pub detections: u64,
    /// Frames written to storage.
    pub captures: u64,
    /// Alerts delivered.
    pub alerts: u64,
    /// Classifier, storage or notifier failures.
    pub errors: u64,
    /// Most recent detection.
    pub last_detection: Option<Class>,
    /// File name of the most recent capture.
    pub last_capture: Option<String>,
}

impl FeederStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn record_detection(&mut self, class: &Class) {
        self.detections = self.detections.saturating_add(1);
        self.last_detection = Some(class.clone());
    }

    pub fn record_capture(&mut self, file: impl Into<String>) {
        self.captures = self.captures.saturating_add(1);
        self.last_capture = Some(file.into());
    }

    pub fn record_alert(&mut self) {
        self.alerts = self.alerts.saturating_add(1);
    }

    pub fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }
}

// =============================================================================
// FRAME TIMING
// =============================================================================

/// How long inference took and how far apart frames are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub inference: Duration,
    /// Time since the previous frame finished.
    pub interval: Duration,
}

impl FrameTiming {
    /// `Inference: 12.34 ms, FPS: 5.00 fps`
    #[must_use]
    pub fn to_text(&self) -> String {
        let ms_hundredths = self.inference.as_micros() / 10;
        let fps = match self.interval.as_micros() {
            0 => String::from("n/a"),
            micros => {
                let fps_hundredths = 100_000_000 / micros;
                format!("{}.{:02}", fps_hundredths / 100, fps_hundredths % 100)
            }
        };
        format!(
            "Inference: {}.{:02} ms, FPS: {} fps",
            ms_hundredths / 100,
            ms_hundredths % 100,
            fps
        )
    }
}

/// Debug report for one frame: timing line, then one line per class.
#[must_use]
pub fn render_results(timing: &FrameTiming, classification: &Classification) -> String {
    let mut output = String::from("\n");
    output.push_str(&timing.to_text());
    output.push('\n');
    for class in &classification.classes {
        output.push_str(&format!(" {}, score={}\n", class.label, class.score));
    }
    output
}

// =============================================================================
// TESTS
// =============================================================================
