//! Prometheus metrics for monitoring room server health.
//!
//! Metrics are recorded through the `metrics` facade and exposed in
//! Prometheus text format when an exporter is installed. Without an exporter
//! every call here is a no-op.
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Active connections, messages sent/received
//! - **Game Metrics**: Active rooms, commands by outcome, moves applied
//! - **Rate Limiting Metrics**: Dropped frames per limiter
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use checkers_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connection_opened();
//! metrics::commands_total("make-move", "ok");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Record a new WebSocket connection.
pub fn websocket_connection_opened() {
    metrics::gauge!("websocket_connections_active").increment(1.0);
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Record a closed WebSocket connection.
pub fn websocket_connection_closed() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Set current active rooms count.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

/// Record a handled command with its outcome (`ok` or an error reason).
pub fn commands_total(command: &'static str, outcome: &str) {
    metrics::counter!("commands_total",
        "command" => command,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment moves applied counter.
pub fn moves_applied_total() {
    metrics::counter!("moves_applied_total").increment(1);
}

/// Record command handling duration in milliseconds.
pub fn command_duration_ms(command: &'static str, duration_ms: f64) {
    metrics::histogram!("command_duration_ms", "command" => command).record(duration_ms);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Increment rate limit hits counter.
pub fn rate_limit_hits_total(limiter: &'static str) {
    metrics::counter!("rate_limit_hits_total", "limiter" => limiter).increment(1);
}
