//! # Birdfeeder
//!
//! Smart birdfeeder daemon entry point.

use birdfeeder::classifier::HttpClassifier;
use birdfeeder::cli::Cli;
use birdfeeder::feeder::{Feeder, FeederSettings};
use birdfeeder::notify::PushoverNotifier;
use birdfeeder::source::SourceKind;
use birdfeeder::storage::CaptureStore;
use birdfeeder::{AppError, api, logging};
use clap::Parser;
use std::process::ExitCode;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received terminate signal, shutting down"),
    }
}

/// Wait until the shutdown flag flips.
async fn wait_for(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn run(cli: Cli) -> Result<(), AppError> {
    std::fs::create_dir_all(&cli.storage)?;
    logging::init(Some(&cli.storage))?;

    let check = cli.check;
    let config = cli.into_config()?;

    if check {
        print!("{}", config.summary());
        return Ok(());
    }

    println!("Loading {} with {} labels.", config.model, config.labels.len());
    info!(summary = %config.summary(), "starting birdfeeder");

    let source = SourceKind::from_config(&config.source, &config.pipe)?;
    let classifier = HttpClassifier::new(&config.inference_url, config.model.clone(), config.top_k)?;
    let notifier = match &config.pushover {
        Some(credentials) => {
            info!("initialising pushover");
            Some(PushoverNotifier::new(credentials.clone())?)
        }
        None => None,
    };
    let store = CaptureStore::open(&config.storage)?;

    let settings = FeederSettings {
        labels: config.labels,
        threshold: config.threshold,
        top_k: config.top_k,
        policy: config.policy,
    };
    let feeder = Feeder::new(source, classifier, store, settings, notifier);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let api_task = config.status_addr.map(|addr| {
        let stats = feeder.stats();
        let stop = wait_for(stop_rx.clone());
        tokio::spawn(async move {
            if let Err(e) = api::serve(addr, stats, stop).await {
                error!(error = %e, "status endpoint failed");
            }
        })
    });

    let result = feeder.run(wait_for(stop_rx)).await;

    if let Some(task) = api_task {
        task.abort();
    }

    result.map(|_| ())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "birdfeeder failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
