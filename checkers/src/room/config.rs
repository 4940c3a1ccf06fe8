//! Room lifecycle configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Room configuration shared by every room of a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Seconds an empty room is kept for reconnection before collection (default: 300)
    pub retention_secs: u64,

    /// Seconds between idle-room sweeps (default: 30)
    pub sweep_interval_secs: u64,

    /// Seconds a collected room's tokens are remembered before being purged (default: 3600)
    pub session_ttl_secs: u64,

    /// Capacity of each room actor's inbox (default: 100)
    pub inbox_capacity: usize,

    /// Capacity of each connection's broadcast channel (default: 32)
    pub event_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            retention_secs: 300,
            sweep_interval_secs: 30,
            session_ttl_secs: 3600,
            inbox_capacity: 100,
            event_buffer: 32,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_secs == 0 {
            return Err("Sweep interval must be at least 1 second".to_string());
        }

        if self.inbox_capacity == 0 || self.event_buffer == 0 {
            return Err("Channel capacities must be greater than zero".to_string());
        }

        if self.session_ttl_secs < self.retention_secs {
            return Err("Session TTL must not be shorter than room retention".to_string());
        }

        Ok(())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
