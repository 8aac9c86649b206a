//! # Logging Module
//!
//! tracing setup: human readable output on stderr plus an append-only
//! `results.log` in the storage directory, so captures can be matched to
//! what the model saw.

use crate::error::AppError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Log file name inside the storage directory.
pub const RESULTS_LOG: &str = "results.log";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "birdfeeder=info,birdfeeder_core=info,tower_http=info";

/// Install the global subscriber. `storage` enables the results log.
pub fn init(storage: Option<&Path>) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file_layer = match storage {
        Some(dir) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(RESULTS_LOG))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialised: {e}")))
}
