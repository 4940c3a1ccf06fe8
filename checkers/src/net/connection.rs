//! Per-connection command dispatch.
//!
//! A [`Connection`] is the transport-independent half of a client link: it
//! remembers which seat the client holds and turns each [`ClientCommand`]
//! into calls on the [`RoomDirectory`]. The transport only has to decode
//! frames, forward the optional reply, and drain the event channel.

use super::messages::{ClientCommand, ServerMessage};
use crate::{
    game::Color,
    room::{Admission, EventSender, RoomCode, RoomDirectory, RoomError},
    session::{ConnectionId, SessionToken},
};
use std::sync::Arc;

/// Seat currently held by a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub room: RoomCode,
    pub color: Color,
    pub token: SessionToken,
}

/// One client link.
pub struct Connection {
    id: ConnectionId,
    directory: Arc<RoomDirectory>,
    outbox: EventSender,
    binding: Option<Binding>,
}

impl Connection {
    /// # Arguments
    ///
    /// * `directory` - Shared room directory
    /// * `outbox` - Channel the rooms push broadcasts into
    pub fn new(directory: Arc<RoomDirectory>, outbox: EventSender) -> Self {
        Self {
            id: ConnectionId::new(),
            directory,
            outbox,
            binding: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Apply one command.
    ///
    /// # Returns
    ///
    /// * `Option<ServerMessage>` - Direct reply for the requester, if any
    pub async fn handle(&mut self, command: ClientCommand) -> Option<ServerMessage> {
        log::debug!("Connection {}: {}", self.id, command);
        match self.dispatch(command).await {
            Ok(reply) => reply,
            Err(e) => {
                log::debug!("Connection {}: rejected: {}", self.id, e);
                Some(ServerMessage::error(&e))
            }
        }
    }

    async fn dispatch(
        &mut self,
        command: ClientCommand,
    ) -> Result<Option<ServerMessage>, RoomError> {
        match command {
            ClientCommand::CreateRoom => {
                let admission = self
                    .directory
                    .create_room(self.id, self.outbox.clone())
                    .await?;
                Ok(Some(self.rebind(admission).await))
            }

            ClientCommand::JoinRoom { room_id } => {
                let admission = self
                    .directory
                    .join_room(&room_id, self.id, self.outbox.clone())
                    .await?;
                Ok(Some(self.rebind(admission).await))
            }

            ClientCommand::ReconnectWithToken { token } => {
                let admission = self
                    .directory
                    .reconnect(&token, self.id, self.outbox.clone())
                    .await?;
                Ok(Some(self.rebind(admission).await))
            }

            ClientCommand::GetAllowedMoves { room_id, from } => {
                let moves = self
                    .directory
                    .allowed_moves(&room_id, self.id, from)
                    .await?;
                Ok(Some(ServerMessage::AllowedMoves { moves }))
            }

            ClientCommand::MakeMove { from, to } => {
                let room = self.bound_room().ok_or(RoomError::NotAPlayer)?;
                self.directory.make_move(&room, self.id, from, to).await?;
                Ok(Some(ServerMessage::Ack))
            }

            ClientCommand::RequestRematch => {
                let room = self.bound_room().ok_or(RoomError::NotInRoom)?;
                self.directory.request_rematch(&room, self.id).await?;
                Ok(Some(ServerMessage::Ack))
            }

            ClientCommand::CancelRematch => {
                let room = self.bound_room().ok_or(RoomError::NotInRoom)?;
                self.directory.cancel_rematch(&room, self.id).await?;
                Ok(Some(ServerMessage::Ack))
            }

            ClientCommand::LeaveRoom { room_id } => {
                if let Err(e) = self.directory.leave_room(&room_id, self.id).await {
                    log::debug!("Connection {}: leave {} ignored: {}", self.id, room_id, e);
                }
                if self.bound_room().as_ref() == Some(&room_id) {
                    self.binding = None;
                }
                Ok(None)
            }
        }
    }

    /// The transport went away: keep the seat reserved for the token holder.
    pub async fn close(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.release(&binding).await;
        }
    }

    fn bound_room(&self) -> Option<RoomCode> {
        self.binding.as_ref().map(|binding| binding.room.clone())
    }

    /// Record a new seat, stepping out of any seat held in another room.
    async fn rebind(&mut self, admission: Admission) -> ServerMessage {
        if let Some(previous) = self.binding.take()
            && previous.room != admission.room.id
        {
            self.release(&previous).await;
        }

        self.binding = Some(Binding {
            room: admission.room.id.clone(),
            color: admission.color,
            token: admission.token.clone(),
        });
        ServerMessage::from(admission)
    }

    async fn release(&self, binding: &Binding) {
        if let Err(e) = self.directory.disconnect(&binding.room, self.id).await {
            log::debug!(
                "Connection {}: room {} already gone: {}",
                self.id,
                binding.room,
                e
            );
        }
    }
}
