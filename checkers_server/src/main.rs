//! Checkers room server using the async actor model.
//!
//! Each room runs as its own actor task managed by a shared `RoomDirectory`;
//! clients talk to it over a single WebSocket endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use checkers::RoomDirectory;
use checkers_server::{api, config::ServerConfig, logging, metrics};
use log::{error, info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a checkers room server

USAGE:
  checkers_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --metrics-bind  IP:PORT  Prometheus exporter address  [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND               Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND              Prometheus exporter address (e.g., 0.0.0.0:9090)
  ROOM_RETENTION_SECS       Seconds an empty room is kept before collection  [default: 300]
  ROOM_SWEEP_INTERVAL_SECS  Seconds between idle-room sweeps  [default: 30]
  SESSION_TTL_SECS          Seconds tokens of a collected room stay known  [default: 3600]
  ROOM_INBOX_CAPACITY       Per-room command queue size  [default: 100]
  CONNECTION_EVENT_BUFFER   Per-connection broadcast queue size  [default: 32]
  RUST_LOG                  Log filter  [default: info]
";

/// How often the active room gauge is refreshed
const ROOM_GAUGE_INTERVAL: Duration = Duration::from_secs(15);

struct Args {
    bind: Option<SocketAddr>,
    metrics_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        metrics_bind: pargs
            .opt_value_from_str("--metrics-bind")
            .context("Invalid --metrics-bind address")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.metrics_bind)?;
    config.validate()?;

    info!(
        "Room settings: retention={}s sweep={}s session_ttl={}s",
        config.rooms.retention_secs, config.rooms.sweep_interval_secs, config.rooms.session_ttl_secs
    );

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{}/metrics", metrics_bind);
    }

    let directory = Arc::new(RoomDirectory::new(config.rooms.clone()));
    let sweeper = directory.spawn_sweeper();

    let gauge_directory = directory.clone();
    let gauge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ROOM_GAUGE_INTERVAL);
        loop {
            interval.tick().await;
            metrics::active_rooms(gauge_directory.room_count().await);
        }
    });

    let app = api::create_router(api::AppState { directory });

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    gauge_task.abort();
    sweeper.abort();

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        warn!("Graceful shutdown disabled; stop the process externally");
        std::future::pending::<()>().await;
    }
}
