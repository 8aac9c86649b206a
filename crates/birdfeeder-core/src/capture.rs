//! # Capture Module
//!
//! Naming and bookkeeping for frames written to storage.

use crate::classification::Class;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Monotonic capture tag: milliseconds since the feeder started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureTag(pub u64);

impl CaptureTag {
    /// Tag for a frame seen at `now` by a feeder started at `start`.
    #[must_use]
    pub fn at(start: Instant, now: Instant) -> Self {
        Self::from_elapsed(now.saturating_duration_since(start))
    }

    #[must_use]
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Zero padded to ten digits so files sort by capture time.
impl fmt::Display for CaptureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// `img-0000012345.jpg`
#[must_use]
pub fn capture_file_name(tag: CaptureTag, ext: &str) -> String {
    format!("img-{tag}.{ext}")
}

/// Why a frame was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    /// Top class passed the capture threshold.
    Detection,
    /// Training mode: label set changed from the previous frame.
    TrainingDifference,
}

impl fmt::Display for SaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detection => "detection",
            Self::TrainingDifference => "training_difference",
        })
    }
}

/// What was written for one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub tag: CaptureTag,
    pub file: String,
    pub reason: SaveReason,
    pub classes: Vec<Class>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_zero_padded_millis() {
        let tag = CaptureTag::from_elapsed(Duration::from_millis(12_345));
        assert_eq!(tag.to_string(), "0000012345");
        assert_eq!(capture_file_name(tag, "jpg"), "img-0000012345.jpg");
    }

    #[test]
    fn tag_from_instants() {
        let start = Instant::now();
        let tag = CaptureTag::at(start, start + Duration::from_secs(3));
        assert_eq!(tag, CaptureTag(3000));
        assert_eq!(CaptureTag::at(start + Duration::from_secs(1), start), CaptureTag(0));
    }

    #[test]
    fn tags_sort_lexically() {
        let a = capture_file_name(CaptureTag(999), "jpg");
        let b = capture_file_name(CaptureTag(1000), "jpg");
        assert!(a < b);
    }
}
