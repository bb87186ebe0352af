use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rttmon::cli::{Cli, Mode};
use rttmon::config::Config;
use rttmon::engine::{Emitter, Responder};
use rttmon::report::StatusReporter;
use rttmon::state::RttStore;
use rttmon::transport::UdpTransport;

/// Bound on the wait for the reporter worker during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const STATUS_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let config = Config::from_cli(&cli)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    let store = Arc::new(RttStore::new());
    let reporter = StatusReporter::start(STATUS_QUEUE_CAPACITY);
    let status = reporter.sender();

    info!(mode = ?config.mode, peer = %config.peer, stream = config.stream_id, "starting");

    let result = match config.mode {
        Mode::Pub => {
            let transport = UdpTransport::connect(config.peer)?;
            Emitter::new(&config, transport, store.clone(), status.clone(), cancel)
                .run()
                .await
        }
        Mode::Sub => {
            let transport = UdpTransport::bind(config.peer)?;
            Responder::new(&config, transport, store.clone(), status.clone(), cancel)
                .run()
                .await
        }
    };

    let dropped = status.dropped();
    drop(status);
    reporter.shutdown(SHUTDOWN_TIMEOUT).await;

    if dropped > 0 {
        debug!(dropped, "status lines dropped under load");
    }
    for (peer, sample) in store.snapshot() {
        info!(
            %peer,
            last_rtt_nanos = sample.last_rtt_nanos,
            observed = sample.observed,
            sent = sample.sent,
            eligibility_checks = sample.eligibility_checks,
            "final peer sample"
        );
    }

    result
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
