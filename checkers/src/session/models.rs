//! Session and connection identifiers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    game::Color,
    room::{RoomCode, SeatClaim},
};

/// Opaque identifier minted for every live transport connection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reconnection credential: 128 random bits, hex encoded.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Number of random bytes behind a token.
    pub const BYTES: usize = 16;

    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTES];
        rand::rng().fill(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to put in logs.
    pub fn redacted(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What a token grants: the seat of `color` in `room`, for as long as
/// the seat stays at `epoch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionBinding {
    pub room: RoomCode,
    pub color: Color,
    pub epoch: u64,
    pub issued_at: DateTime<Utc>,
    /// Set once the room has been collected. The binding is purged after
    /// the session TTL has elapsed from this instant.
    pub retired_at: Option<Instant>,
}

impl SessionBinding {
    pub fn new(room: RoomCode, claim: SeatClaim) -> Self {
        Self {
            room,
            color: claim.color,
            epoch: claim.epoch,
            issued_at: Utc::now(),
            retired_at: None,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    pub fn claim(&self) -> SeatClaim {
        SeatClaim {
            color: self.color,
            epoch: self.epoch,
        }
    }
}
