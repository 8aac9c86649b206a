//! # Birdfeeder Core
//!
//! The deterministic decision engine behind the smart birdfeeder.
//!
//! Frames come in as JPEG bytes, the model backend answers with
//! `(label id, score)` pairs, and this crate decides what happens next:
//! print, capture to disk, alert, or nothing.
//!
//! ## Constraints
//!
//! - No async, no network, no wall clock. Time is passed in as `Instant`.
//! - No floating point. Scores are integer basis points (see [`Score`]).
//! - `BTreeMap`/`BTreeSet` only, so every output is reproducible.

pub mod capture;
pub mod classification;
pub mod cooldown;
pub mod error;
pub mod exif;
pub mod labels;
pub mod mjpeg;
pub mod model;
pub mod policy;
pub mod score;
pub mod stats;

pub use capture::{CaptureRecord, CaptureTag, SaveReason, capture_file_name};
pub use classification::{Class, Classification, RawClass};
pub use cooldown::Cooldown;
pub use error::{CoreError, Result};
pub use labels::LabelMap;
pub use mjpeg::MjpegSplitter;
pub use model::ModelSpec;
pub use policy::{Decision, FeederPolicy, PolicyConfig, label_set_differs};
pub use score::Score;
pub use stats::{FeederStats, FrameTiming, render_results};
