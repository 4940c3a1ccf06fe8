//! JSON frames exchanged with clients.
//!
//! Commands arrive as [`ClientCommand`], tagged by `type`; everything sent
//! back is a [`ServerMessage`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    game::{Color, Square},
    room::{Admission, RoomCode, RoomError, RoomEvent, RoomSnapshot},
    session::SessionToken,
};

/// A command from a client, one per JSON text frame.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Open a new room and sit in it as red.
    CreateRoom,
    /// Take a free or abandoned seat of an existing room.
    JoinRoom { room_id: RoomCode },
    /// Return to the seat a token was issued for.
    ReconnectWithToken { token: SessionToken },
    /// Ask where the piece at `from` may go. Nothing is changed.
    GetAllowedMoves { room_id: RoomCode, from: Square },
    /// Move a piece in the room the connection is bound to.
    MakeMove { from: Square, to: Square },
    RequestRematch,
    CancelRematch,
    /// Give up the seat. No reply is sent.
    LeaveRoom { room_id: RoomCode },
}

impl ClientCommand {
    /// Wire name of the command, used for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::ReconnectWithToken { .. } => "reconnect-with-token",
            Self::GetAllowedMoves { .. } => "get-allowed-moves",
            Self::MakeMove { .. } => "make-move",
            Self::RequestRematch => "request-rematch",
            Self::CancelRematch => "cancel-rematch",
            Self::LeaveRoom { .. } => "leave-room",
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinRoom { room_id } | Self::LeaveRoom { room_id } => {
                write!(f, "{} {}", self.name(), room_id)
            }
            Self::GetAllowedMoves { room_id, from } => {
                write!(f, "{} {} {}", self.name(), room_id, from)
            }
            Self::MakeMove { from, to } => write!(f, "{} {} -> {}", self.name(), from, to),
            _ => f.write_str(self.name()),
        }
    }
}

/// A message from the server to a client.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The connection now sits in `room` as `color`; keep `token` to
    /// reconnect later.
    RoomJoined {
        room: RoomSnapshot,
        color: Color,
        token: SessionToken,
    },
    AllowedMoves { moves: Vec<Square> },
    /// The command was applied.
    Ack,
    /// The command was rejected. Sent to the requester only.
    Error { reason: String, message: String },
    /// Room state, broadcast to every occupant after each change.
    RoomState(RoomSnapshot),
    /// Another connection reconnected into this connection's seat.
    Displaced { room_id: RoomCode, color: Color },
}

impl ServerMessage {
    pub fn error(err: &RoomError) -> Self {
        Self::Error {
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }

    pub fn rate_limited() -> Self {
        Self::Error {
            reason: "RateLimited".to_string(),
            message: "too many messages, slow down".to_string(),
        }
    }
}

impl From<Admission> for ServerMessage {
    fn from(admission: Admission) -> Self {
        Self::RoomJoined {
            room: admission.room,
            color: admission.color,
            token: admission.token,
        }
    }
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::State(snapshot) => Self::RoomState(snapshot),
            RoomEvent::Displaced { room, color } => Self::Displaced {
                room_id: room,
                color,
            },
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::RoomJoined { room, color, .. } => write!(f, "joined {} as {}", room.id, color),
            Self::AllowedMoves { moves } => write!(f, "{} allowed move(s)", moves.len()),
            Self::Ack => f.write_str("ack"),
            Self::Error { reason, message } => write!(f, "{reason}: {message}"),
            Self::RoomState(snapshot) => write!(f, "state of room {}", snapshot.id),
            Self::Displaced { room_id, color } => {
                write!(f, "displaced from {} in room {}", color, room_id)
            }
        }
    }
}
