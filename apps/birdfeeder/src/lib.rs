//! # Birdfeeder Library
//!
//! This library exposes the birdfeeder daemon modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod classifier;
pub mod cli;
pub mod error;
pub mod feeder;
pub mod logging;
pub mod notify;
pub mod source;
pub mod storage;

pub use error::AppError;

// Re-export birdfeeder_core for convenience
pub use birdfeeder_core;
