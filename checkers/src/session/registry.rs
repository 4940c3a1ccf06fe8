//! In-memory session registry mapping tokens to seats.

use super::models::{SessionBinding, SessionToken};
use crate::room::{RoomCode, SeatClaim};
use std::{collections::HashMap, time::Duration};
use tokio::{sync::RwLock, time::Instant};

/// Registry of issued session tokens.
///
/// Tokens live here independently of their rooms: when a room is collected
/// its tokens are retired rather than removed, so a late reconnection is
/// told the room is gone instead of that the token is unknown.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionToken, SessionBinding>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token bound to `claim` in `room`
    pub async fn issue(&self, room: RoomCode, claim: SeatClaim) -> SessionToken {
        let mut sessions = self.sessions.write().await;
        let token = loop {
            let candidate = SessionToken::generate();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        log::debug!(
            "Issued session {}.. for {} (epoch {}) in room {}",
            token.redacted(),
            claim.color,
            claim.epoch,
            room
        );
        sessions.insert(token.clone(), SessionBinding::new(room, claim));
        token
    }

    /// Look up the binding of a token
    pub async fn resolve(&self, token: &SessionToken) -> Option<SessionBinding> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Token already issued for exactly `claim` in `room`
    pub async fn find(&self, room: &RoomCode, claim: SeatClaim) -> Option<SessionToken> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|(_, binding)| {
                binding.room == *room && binding.claim() == claim && !binding.is_retired()
            })
            .map(|(token, _)| token.clone())
    }

    /// Drop the tokens of `claim.color` in `room` that were issued for an
    /// earlier epoch. Tokens at `claim.epoch` or later are kept.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of tokens removed
    pub async fn revoke(&self, room: &RoomCode, claim: SeatClaim) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, binding| {
            !(binding.room == *room
                && binding.color == claim.color
                && binding.epoch < claim.epoch)
        });
        before - sessions.len()
    }

    /// Mark every token of a collected room as retired
    pub async fn retire_room(&self, room: &RoomCode) -> usize {
        let now = Instant::now();
        let mut retired = 0;
        for binding in self.sessions.write().await.values_mut() {
            if binding.room == *room && !binding.is_retired() {
                binding.retired_at = Some(now);
                retired += 1;
            }
        }
        retired
    }

    /// Remove tokens retired for longer than `ttl`
    pub async fn purge_retired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, binding| {
            binding
                .retired_at
                .is_none_or(|retired_at| retired_at.elapsed() < ttl)
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
