//! Room actor implementation with async message handling.

use super::{
    code::RoomCode,
    config::RoomConfig,
    errors::RoomError,
    messages::{
        EventSender, MoveRecord, Responder, RoomEvent, RoomMessage, RoomSnapshot, Seated,
    },
    state::{Room, SeatClaim},
};
use crate::{
    game::{Color, Square},
    session::ConnectionId,
};
use chrono::Utc;
use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

/// Room actor handle for sending messages
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    code: RoomCode,
}

impl RoomHandle {
    /// Create a new room handle
    pub fn new(sender: mpsc::Sender<RoomMessage>, code: RoomCode) -> Self {
        Self { sender, code }
    }

    /// Get room code
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor behind this handle has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::RoomNotFound)
    }

    /// Send a message built around a fresh responder and wait for the reply.
    ///
    /// A reply channel dropped without an answer means the actor failed
    /// while handling the message.
    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (response, reply) = oneshot::channel();
        self.send(build(response)).await?;
        reply.await.map_err(|_| RoomError::Internal)?
    }

    pub async fn join(
        &self,
        connection: ConnectionId,
        outbox: EventSender,
    ) -> Result<Seated, RoomError> {
        self.request(|response| RoomMessage::Join {
            connection,
            outbox,
            response,
        })
        .await
    }

    pub async fn reattach(
        &self,
        connection: ConnectionId,
        claim: SeatClaim,
        outbox: EventSender,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|response| RoomMessage::Reattach {
            connection,
            claim,
            outbox,
            response,
        })
        .await
    }

    pub async fn allowed_moves(
        &self,
        connection: ConnectionId,
        from: Square,
    ) -> Result<Vec<Square>, RoomError> {
        self.request(|response| RoomMessage::AllowedMoves {
            connection,
            from,
            response,
        })
        .await
    }

    pub async fn make_move(
        &self,
        connection: ConnectionId,
        from: Square,
        to: Square,
    ) -> Result<MoveRecord, RoomError> {
        self.request(|response| RoomMessage::MakeMove {
            connection,
            from,
            to,
            response,
        })
        .await
    }

    pub async fn request_rematch(&self, connection: ConnectionId) -> Result<bool, RoomError> {
        self.request(|response| RoomMessage::RequestRematch {
            connection,
            response,
        })
        .await
    }

    pub async fn cancel_rematch(&self, connection: ConnectionId) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::CancelRematch {
            connection,
            response,
        })
        .await
    }

    pub async fn leave(&self, connection: ConnectionId) -> Result<Option<SeatClaim>, RoomError> {
        self.request(|response| RoomMessage::Leave {
            connection,
            response,
        })
        .await
    }

    pub async fn disconnect(&self, connection: ConnectionId) -> Result<Option<Color>, RoomError> {
        self.request(|response| RoomMessage::Disconnect {
            connection,
            response,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|response| RoomMessage::GetSnapshot { response })
            .await
    }

    pub async fn close_if_idle(&self, retention: Duration) -> Result<bool, RoomError> {
        self.request(|response| RoomMessage::CloseIfIdle {
            retention,
            response,
        })
        .await
    }
}

/// Room actor owning a single match
pub struct RoomActor {
    /// Match state
    room: Room,

    /// Message inbox
    inbox: mpsc::Receiver<RoomMessage>,

    /// Broadcast channels of seated connections
    subscribers: HashMap<ConnectionId, EventSender>,

    /// When the room last became empty
    empty_since: Option<Instant>,

    /// Is room closed
    is_closed: bool,
}

impl RoomActor {
    /// Create a new room actor
    ///
    /// # Arguments
    ///
    /// * `code` - Room code
    /// * `config` - Room configuration
    ///
    /// # Returns
    ///
    /// * `(RoomActor, RoomHandle)` - Actor and handle for sending messages
    pub fn new(code: RoomCode, config: &RoomConfig) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);

        let actor = Self {
            room: Room::new(code.clone()),
            inbox,
            subscribers: HashMap::new(),
            empty_since: Some(Instant::now()),
            is_closed: false,
        };

        (actor, RoomHandle::new(sender, code))
    }

    /// Run the room actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} open", self.room.id());

        while let Some(message) = self.inbox.recv().await {
            let handled = panic::catch_unwind(AssertUnwindSafe(|| self.handle_message(message)));
            if handled.is_err() {
                log::error!(
                    "Room {}: panic while handling a message, request dropped",
                    self.room.id()
                );
            }

            self.track_idle();
            if self.is_closed {
                break;
            }
        }

        self.inbox.close();
        while let Ok(message) = self.inbox.try_recv() {
            message.reject(RoomError::RoomNotFound);
        }

        log::info!("Room {} closed", self.room.id());
    }

    /// Handle a room message
    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                connection,
                outbox,
                response,
            } => match self.room.join(connection) {
                Ok(claim) => {
                    log::info!(
                        "Room {}: {} joined as {} (epoch {})",
                        self.room.id(),
                        connection,
                        claim.color,
                        claim.epoch
                    );
                    self.subscribers.insert(connection, outbox);
                    let snapshot = self.room.snapshot();
                    let _ = response.send(Ok(Seated { claim, snapshot }));
                    self.broadcast();
                }
                Err(e) => {
                    let _ = response.send(Err(e));
                }
            },

            RoomMessage::Reattach {
                connection,
                claim,
                outbox,
                response,
            } => {
                let stale = match self.room.reattach(connection, claim) {
                    Ok(stale) => stale,
                    Err(e) => {
                        log::debug!(
                            "Room {}: stale claim on {} (epoch {})",
                            self.room.id(),
                            claim.color,
                            claim.epoch
                        );
                        let _ = response.send(Err(e));
                        return;
                    }
                };
                if let Some(stale) = stale {
                    log::info!(
                        "Room {}: {} displaced {} from {}",
                        self.room.id(),
                        connection,
                        stale,
                        claim.color
                    );
                    if let Some(sender) = self.subscribers.remove(&stale) {
                        let _ = sender.try_send(RoomEvent::Displaced {
                            room: self.room.id().clone(),
                            color: claim.color,
                        });
                    }
                }
                self.subscribers.insert(connection, outbox);
                let _ = response.send(Ok(self.room.snapshot()));
                self.broadcast();
            }

            RoomMessage::AllowedMoves {
                connection,
                from,
                response,
            } => {
                let _ = response.send(self.room.allowed_moves(connection, from));
            }

            RoomMessage::MakeMove {
                connection,
                from,
                to,
                response,
            } => {
                let result = self.room.make_move(connection, from, to, Utc::now());
                match &result {
                    Ok(record) => log::debug!(
                        "Room {}: {} moved {} -> {}",
                        self.room.id(),
                        record.player,
                        record.from,
                        record.to
                    ),
                    Err(e) => log::debug!("Room {}: move rejected: {}", self.room.id(), e),
                }
                let applied = result.is_ok();
                let _ = response.send(result);
                if applied {
                    self.broadcast();
                }
            }

            RoomMessage::RequestRematch {
                connection,
                response,
            } => {
                let result = self.room.request_rematch(connection);
                if let Ok(true) = result {
                    log::info!("Room {}: rematch started", self.room.id());
                }
                let accepted = result.is_ok();
                let _ = response.send(result);
                if accepted {
                    self.broadcast();
                }
            }

            RoomMessage::CancelRematch {
                connection,
                response,
            } => {
                let result = self.room.cancel_rematch(connection);
                let accepted = result.is_ok();
                let _ = response.send(result);
                if accepted {
                    self.broadcast();
                }
            }

            RoomMessage::Leave {
                connection,
                response,
            } => {
                let released = self.room.release(connection);
                self.unsubscribe(connection, released.map(|claim| claim.color), "left");
                let _ = response.send(Ok(released));
            }

            RoomMessage::Disconnect {
                connection,
                response,
            } => {
                let color = self.room.vacate(connection);
                self.unsubscribe(connection, color, "disconnected");
                let _ = response.send(Ok(color));
            }

            RoomMessage::GetSnapshot { response } => {
                let _ = response.send(Ok(self.room.snapshot()));
            }

            RoomMessage::CloseIfIdle {
                retention,
                response,
            } => {
                let idle = self.room.is_empty()
                    && self
                        .empty_since
                        .is_some_and(|since| since.elapsed() >= retention);
                if idle {
                    self.is_closed = true;
                }
                let _ = response.send(Ok(idle));
            }

            #[cfg(test)]
            RoomMessage::Explode { response } => {
                drop(response);
                panic!("room {} exploded on request", self.room.id());
            }
        }
    }

    fn unsubscribe(&mut self, connection: ConnectionId, color: Option<Color>, verb: &str) {
        self.subscribers.remove(&connection);
        if let Some(color) = color {
            log::info!("Room {}: {} ({}) {}", self.room.id(), connection, color, verb);
            self.broadcast();
        }
    }

    /// Start or stop the retention clock depending on occupancy
    fn track_idle(&mut self) {
        if !self.room.is_empty() {
            self.empty_since = None;
        } else if self.empty_since.is_none() {
            self.empty_since = Some(Instant::now());
        }
    }

    /// Push the current snapshot to every subscriber
    fn broadcast(&mut self) {
        let event = RoomEvent::State(self.room.snapshot());
        let room = self.room.id();
        self.subscribers
            .retain(|connection, sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Room {}: subscriber {} channel full, dropping notification",
                        room,
                        connection
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Room {}: subscriber {} gone, removing", room, connection);
                    false
                }
            });
    }
}
