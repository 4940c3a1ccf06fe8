//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber that also receives records emitted through
//! the `log` facade by the `checkers` library, plus a few helpers for the
//! events the WebSocket transport reports.

use checkers::ConnectionId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Commands slower than this are reported at `warn`.
const SLOW_COMMAND_MS: u64 = 250;

/// Initialize structured logging
///
/// Log levels are configurable through the `RUST_LOG` environment variable
/// and default to `info`.
///
/// # Example
///
/// ```no_run
/// use checkers_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a processed client command
///
/// # Arguments
///
/// * `connection` - Connection that sent the command
/// * `command` - Wire name of the command
/// * `outcome` - `ok`, or the error reason code
/// * `duration_ms` - Time spent handling the command
pub fn log_command(connection: ConnectionId, command: &str, outcome: &str, duration_ms: u64) {
    if duration_ms > SLOW_COMMAND_MS {
        tracing::warn!(
            connection = %connection,
            command = command,
            outcome = outcome,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow command"
        );
    } else {
        tracing::debug!(
            connection = %connection,
            command = command,
            outcome = outcome,
            duration_ms = duration_ms,
            "Command handled"
        );
    }
}

/// Log a frame dropped by a rate limiter
///
/// # Arguments
///
/// * `connection` - Offending connection
/// * `limiter` - Which window was exceeded (`burst` or `sustained`)
pub fn log_rate_limited(connection: ConnectionId, limiter: &str) {
    tracing::warn!(
        connection = %connection,
        limiter = limiter,
        "Rate limit exceeded, dropping message"
    );
}
