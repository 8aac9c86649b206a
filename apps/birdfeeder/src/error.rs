//! # Error Module
//!
//! Errors surfaced by the daemon.

use birdfeeder_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Label, score, model or frame codec failure from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The classification backend answered with an error.
    #[error("inference backend error: {0}")]
    Inference(String),

    /// The notification service rejected an alert.
    #[error("notification failed: {0}")]
    Notify(String),

    /// The camera stream could not be recovered.
    #[error("frame source error: {0}")]
    Source(String),

    #[error("configuration error: {0}")]
    Config(String),
}
