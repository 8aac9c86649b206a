//! # Error Module
//!
//! Every failure the pure core can report.

use thiserror::Error;

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Score text was malformed or outside `[0, 1]`.
    #[error("invalid score '{0}': expected a decimal between 0 and 1")]
    InvalidScore(String),

    /// A label file line did not match `<id> <label>`.
    #[error("label file line {line} is malformed: '{content}'")]
    LabelLine { line: usize, content: String },

    /// The label file had no usable entries.
    #[error("label file contains no labels")]
    NoLabels,

    /// `--model` could not be split into path and device.
    #[error("invalid model spec '{0}': expected <path>[@<device>]")]
    InvalidModel(String),

    /// Bytes do not start with a JPEG SOI marker.
    #[error("frame is not a JPEG image")]
    NotJpeg,

    /// The EXIF payload does not fit in a single APP1 segment.
    #[error("EXIF payload of {0} bytes exceeds the APP1 segment limit")]
    ExifTooLarge(usize),

    /// I/O failure while reading core inputs (label files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
