//! Headline producer: binary entrypoint.
//! Loads configuration, wires tracing and Ctrl+C, and runs the dispatcher
//! against Azure Event Hubs until stopped.
//!
//! Exit codes: 0 on orderly stop, 2 on configuration failure, 1 on transport failure.

use std::process::ExitCode;

use fintech_headline_producer::broker::eventhub::EventHubConnector;
use fintech_headline_producer::config::ProducerConfig;
use fintech_headline_producer::{metrics, Dispatcher, ProducerError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `PRODUCER_LOG_JSON=1` switches to JSON lines.
/// Filter comes from `RUST_LOG`, falling back to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("PRODUCER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match ProducerConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "failed to load configuration");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(config = ?cfg, "configuration resolved");

    if let Some(addr) = cfg.metrics_listen {
        if let Err(e) = metrics::install_prometheus(addr) {
            tracing::warn!(error = %e, "metrics exporter not started");
        }
    }

    let rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stopping data producer.");
            let _ = stop_tx.send(true);
        }
    });

    let connector = EventHubConnector::new();
    let mut dispatcher = Dispatcher::new(cfg.dispatcher_settings(), rng);

    match dispatcher.run(&connector, stop_rx).await {
        Ok(summary) => {
            tracing::debug!(events_sent = summary.events_sent, stop = ?summary.stop, "run finished");
            ExitCode::SUCCESS
        }
        Err(e @ ProducerError::Configuration(_)) => {
            tracing::error!(error = %e, "cannot start producer");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "producer terminated");
            ExitCode::FAILURE
        }
    }
}
