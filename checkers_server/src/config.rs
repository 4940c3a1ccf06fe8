//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use checkers::room::RoomConfig;
use std::net::{Ipv4Addr, SocketAddr};

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Room lifecycle configuration
    pub rooms: RoomConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        Self::from_vars(
            |key| std::env::var(key).ok(),
            bind_override,
            metrics_bind_override,
        )
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is present but unparsable
    pub fn from_vars(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_addr(&lookup, "SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => parse_addr(&lookup, "METRICS_BIND")?,
        };

        let defaults = RoomConfig::default();
        let rooms = RoomConfig {
            retention_secs: parse_var_or(&lookup, "ROOM_RETENTION_SECS", defaults.retention_secs),
            sweep_interval_secs: parse_var_or(
                &lookup,
                "ROOM_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            ),
            session_ttl_secs: parse_var_or(&lookup, "SESSION_TTL_SECS", defaults.session_ttl_secs),
            inbox_capacity: parse_var_or(&lookup, "ROOM_INBOX_CAPACITY", defaults.inbox_capacity),
            event_buffer: parse_var_or(&lookup, "CONNECTION_EVENT_BUFFER", defaults.event_buffer),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            rooms,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rooms.validate().map_err(|reason| ConfigError::Invalid {
            var: "ROOM_*".to_string(),
            reason,
        })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl ConfigError {
    /// Stable reason code, matching the protocol's error codes
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "InvalidConfig",
        }
    }
}

/// Helper to parse a variable with default fallback
fn parse_var_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_addr(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<SocketAddr>, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim().parse().map_err(|e| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("Not a socket address ({})", e),
            })
        })
        .transpose()
}
