//! Room directory for spawning, finding and collecting room actors.

use super::{
    actor::{RoomActor, RoomHandle},
    code::RoomCode,
    config::RoomConfig,
    errors::RoomError,
    messages::{Admission, EventSender, MoveRecord, RoomSnapshot},
};
use crate::{
    game::{Color, Square},
    session::{ConnectionId, SessionRegistry, SessionToken},
};
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

/// Directory of live rooms and the sessions that point into them
pub struct RoomDirectory {
    /// Room configuration
    config: RoomConfig,

    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomCode, RoomHandle>>>,

    /// Issued reconnection tokens
    sessions: Arc<SessionRegistry>,
}

impl RoomDirectory {
    /// Create a new room directory
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Create a room and seat `connection` in it as red.
    ///
    /// # Arguments
    ///
    /// * `connection` - Creating connection
    /// * `outbox` - Channel receiving the room's broadcasts
    ///
    /// # Returns
    ///
    /// * `Result<Admission, RoomError>` - Snapshot, color and fresh token
    pub async fn create_room(
        &self,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Admission, RoomError> {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = RoomCode::generate();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let (actor, handle) = RoomActor::new(code.clone(), &self.config);
        rooms.insert(code.clone(), handle.clone());
        drop(rooms);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned room {}", code);

        self.seat(&handle, connection, outbox).await
    }

    /// Get a room handle
    pub async fn get_room(&self, code: &RoomCode) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(code).cloned()
    }

    async fn require_room(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.get_room(code).await.ok_or(RoomError::RoomNotFound)
    }

    /// Seat `connection` in an existing room
    pub async fn join_room(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Admission, RoomError> {
        let handle = self.require_room(code).await?;
        self.seat(&handle, connection, outbox).await
    }

    /// Join through the actor and hand out the token for the resulting claim.
    ///
    /// A connection that was already seated gets its existing token back.
    /// A new claim gets a fresh token, and tokens left over from earlier
    /// holders of the seat are revoked.
    async fn seat(
        &self,
        handle: &RoomHandle,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Admission, RoomError> {
        let seated = handle.join(connection, outbox).await?;
        let code = handle.code();
        let claim = seated.claim;

        let token = match self.sessions.find(code, claim).await {
            Some(token) => token,
            None => {
                let token = self.sessions.issue(code.clone(), claim).await;
                let revoked = self.sessions.revoke(code, claim).await;
                if revoked > 0 {
                    log::info!(
                        "Room {}: {} taken over, revoked {} stale token(s)",
                        code,
                        claim.color,
                        revoked
                    );
                }
                token
            }
        };

        Ok(Admission {
            room: seated.snapshot,
            color: claim.color,
            token,
        })
    }

    /// Re-attach `connection` to the seat a token was issued for.
    ///
    /// The token is returned unchanged.
    pub async fn reconnect(
        &self,
        token: &SessionToken,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Admission, RoomError> {
        let binding = self
            .sessions
            .resolve(token)
            .await
            .ok_or(RoomError::InvalidToken)?;
        if binding.is_retired() {
            return Err(RoomError::RoomNotFound);
        }

        let handle = self.require_room(&binding.room).await?;
        let room = handle.reattach(connection, binding.claim(), outbox).await?;
        log::info!(
            "Session {}.. reconnected to room {} as {}",
            token.redacted(),
            binding.room,
            binding.color
        );

        Ok(Admission {
            room,
            color: binding.color,
            token: token.clone(),
        })
    }

    pub async fn allowed_moves(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
        from: Square,
    ) -> Result<Vec<Square>, RoomError> {
        self.require_room(code)
            .await?
            .allowed_moves(connection, from)
            .await
    }

    pub async fn make_move(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
        from: Square,
        to: Square,
    ) -> Result<MoveRecord, RoomError> {
        self.require_room(code)
            .await?
            .make_move(connection, from, to)
            .await
    }

    pub async fn request_rematch(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
    ) -> Result<bool, RoomError> {
        self.require_room(code)
            .await?
            .request_rematch(connection)
            .await
    }

    pub async fn cancel_rematch(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
    ) -> Result<(), RoomError> {
        self.require_room(code)
            .await?
            .cancel_rematch(connection)
            .await
    }

    /// Give up a seat so a newcomer may take it.
    ///
    /// Only tokens issued before the release are revoked; a newcomer who
    /// took the seat in the meantime keeps theirs.
    pub async fn leave_room(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
    ) -> Result<Option<Color>, RoomError> {
        let released = self.require_room(code).await?.leave(connection).await?;
        if let Some(claim) = released {
            let revoked = self.sessions.revoke(code, claim).await;
            log::debug!("Room {}: revoked {} token(s) for {}", code, revoked, claim.color);
        }
        Ok(released.map(|claim| claim.color))
    }

    /// Drop a connection from its seat, keeping the seat reserved.
    pub async fn disconnect(
        &self,
        code: &RoomCode,
        connection: ConnectionId,
    ) -> Result<Option<Color>, RoomError> {
        self.require_room(code).await?.disconnect(connection).await
    }

    pub async fn snapshot(&self, code: &RoomCode) -> Result<RoomSnapshot, RoomError> {
        self.require_room(code).await?.snapshot().await
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Collect rooms that have been empty for longer than the retention
    /// window and purge expired tokens.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of rooms collected
    pub async fn sweep(&self) -> usize {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let retention = self.config.retention();

        let mut collected = Vec::new();
        for handle in handles {
            match handle.close_if_idle(retention).await {
                Ok(true) | Err(RoomError::RoomNotFound) => collected.push(handle),
                Ok(false) => {}
                Err(e) => log::warn!("Room {}: idle check failed: {}", handle.code(), e),
            }
        }

        let mut removed = Vec::new();
        let mut rooms = self.rooms.write().await;
        for handle in collected {
            let code = handle.code();
            // A closing actor may not have dropped its inbox yet; the next
            // sweep picks it up.
            if rooms.get(code).is_some_and(RoomHandle::is_closed) {
                rooms.remove(code);
                removed.push(code.clone());
            }
        }
        drop(rooms);

        for code in &removed {
            let retired = self.sessions.retire_room(code).await;
            log::info!("Collected idle room {} ({} session(s) retired)", code, retired);
        }

        let purged = self.sessions.purge_retired(self.config.session_ttl()).await;
        if purged > 0 {
            log::debug!("Purged {} expired session(s)", purged);
        }

        removed.len()
    }

    /// Run [`Self::sweep`] every sweep interval until the directory is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let directory: Weak<Self> = Arc::downgrade(self);
        let mut ticker = interval(self.config.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(directory) = directory.upgrade() else {
                    break;
                };
                directory.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn outbox() -> EventSender {
        mpsc::channel(32).0
    }

    #[tokio::test]
    async fn test_create_room_seats_creator_as_red() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let admission = directory
            .create_room(ConnectionId::new(), outbox())
            .await
            .unwrap();

        assert_eq!(admission.color, Color::Red);
        assert_eq!(admission.room.players_count, 1);
        assert_eq!(directory.room_count().await, 1);
        assert!(directory.sessions().resolve(&admission.token).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let code = RoomCode::from("NOPE00");
        assert_eq!(
            directory
                .join_room(&code, ConnectionId::new(), outbox())
                .await
                .err(),
            Some(RoomError::RoomNotFound)
        );
        assert_eq!(
            directory.snapshot(&code).await.err(),
            Some(RoomError::RoomNotFound)
        );
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let result = directory
            .reconnect(
                &SessionToken::from("0123456789abcdef0123456789abcdef"),
                ConnectionId::new(),
                outbox(),
            )
            .await;
        assert_eq!(result.err(), Some(RoomError::InvalidToken));
    }

    #[tokio::test]
    async fn test_leave_revokes_token() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let creator = ConnectionId::new();
        let admission = directory.create_room(creator, outbox()).await.unwrap();

        let left = directory
            .leave_room(&admission.room.id, creator)
            .await
            .unwrap();
        assert_eq!(left, Some(Color::Red));

        let result = directory
            .reconnect(&admission.token, ConnectionId::new(), outbox())
            .await;
        assert_eq!(result.err(), Some(RoomError::InvalidToken));
    }

    #[tokio::test]
    async fn test_rejoin_returns_same_token() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let creator = ConnectionId::new();
        let admission = directory.create_room(creator, outbox()).await.unwrap();

        let again = directory
            .join_room(&admission.room.id, creator, outbox())
            .await
            .unwrap();
        assert_eq!(again.color, Color::Red);
        assert_eq!(again.token, admission.token);
        assert_eq!(directory.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_takeover_revokes_previous_holder() {
        let directory = RoomDirectory::new(RoomConfig::default());
        let red = ConnectionId::new();
        let black = ConnectionId::new();
        let created = directory.create_room(red, outbox()).await.unwrap();
        let code = created.room.id.clone();
        let joined = directory.join_room(&code, black, outbox()).await.unwrap();
        directory.disconnect(&code, black).await.unwrap();

        let newcomer = directory
            .join_room(&code, ConnectionId::new(), outbox())
            .await
            .unwrap();
        assert_eq!(newcomer.color, Color::Black);
        assert_eq!(newcomer.room.players_count, 2);

        let result = directory
            .reconnect(&joined.token, ConnectionId::new(), outbox())
            .await;
        assert_eq!(result.err(), Some(RoomError::InvalidToken));
        assert!(directory.sessions().resolve(&newcomer.token).await.is_some());
        assert!(directory.sessions().resolve(&created.token).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_keeps_occupied_rooms() {
        let config = RoomConfig {
            retention_secs: 0,
            ..RoomConfig::default()
        };
        let directory = RoomDirectory::new(config);
        directory
            .create_room(ConnectionId::new(), outbox())
            .await
            .unwrap();

        assert_eq!(directory.sweep().await, 0);
        assert_eq!(directory.room_count().await, 1);
    }
}
