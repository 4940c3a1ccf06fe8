//! Room actor message types.

use super::{
    code::RoomCode,
    errors::RoomError,
    state::{RoomPhase, SeatClaim},
};
use crate::{
    game::{Board, Color, Square},
    session::{ConnectionId, SessionToken},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One-shot reply channel carried by every room message.
pub type Responder<T> = oneshot::Sender<Result<T, RoomError>>;

/// Channel a connection registers with a room to receive broadcasts.
pub type EventSender = mpsc::Sender<RoomEvent>;

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Take a free or abandoned seat
    Join {
        connection: ConnectionId,
        outbox: EventSender,
        response: Responder<Seated>,
    },

    /// Re-attach a connection to a reserved seat, if it is still held
    /// under `claim`
    Reattach {
        connection: ConnectionId,
        claim: SeatClaim,
        outbox: EventSender,
        response: Responder<RoomSnapshot>,
    },

    /// Destinations of the piece at `from`
    AllowedMoves {
        connection: ConnectionId,
        from: Square,
        response: Responder<Vec<Square>>,
    },

    MakeMove {
        connection: ConnectionId,
        from: Square,
        to: Square,
        response: Responder<MoveRecord>,
    },

    /// Vote for a rematch; answers whether the room was reset
    RequestRematch {
        connection: ConnectionId,
        response: Responder<bool>,
    },

    CancelRematch {
        connection: ConnectionId,
        response: Responder<()>,
    },

    /// Explicit leave: the seat reservation is released
    Leave {
        connection: ConnectionId,
        response: Responder<Option<SeatClaim>>,
    },

    /// Transport went away: the seat stays reserved
    Disconnect {
        connection: ConnectionId,
        response: Responder<Option<Color>>,
    },

    GetSnapshot {
        response: Responder<RoomSnapshot>,
    },

    /// Close the room if it has been empty for at least `retention`
    CloseIfIdle {
        retention: Duration,
        response: Responder<bool>,
    },

    /// Panics inside the actor
    #[cfg(test)]
    Explode { response: Responder<()> },
}

impl RoomMessage {
    /// Answer the message with `error` without handling it.
    pub(crate) fn reject(self, error: RoomError) {
        match self {
            Self::Join { response, .. } => {
                let _ = response.send(Err(error));
            }
            Self::Reattach { response, .. } | Self::GetSnapshot { response } => {
                let _ = response.send(Err(error));
            }
            Self::AllowedMoves { response, .. } => {
                let _ = response.send(Err(error));
            }
            Self::MakeMove { response, .. } => {
                let _ = response.send(Err(error));
            }
            Self::RequestRematch { response, .. } | Self::CloseIfIdle { response, .. } => {
                let _ = response.send(Err(error));
            }
            Self::CancelRematch { response, .. } => {
                let _ = response.send(Err(error));
            }
            #[cfg(test)]
            Self::Explode { response } => {
                let _ = response.send(Err(error));
            }
            Self::Leave { response, .. } => {
                let _ = response.send(Err(error));
            }
            Self::Disconnect { response, .. } => {
                let _ = response.send(Err(error));
            }
        }
    }
}

/// Notifications pushed to subscribed connections
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Full room state after any change
    State(RoomSnapshot),

    /// Another connection re-attached to this connection's seat
    Displaced { room: RoomCode, color: Color },
}

/// Reply to a successful join
#[derive(Debug, Clone)]
pub struct Seated {
    pub claim: SeatClaim,
    pub snapshot: RoomSnapshot,
}

/// Everything a client needs after entering a room
#[derive(Debug, Clone)]
pub struct Admission {
    pub room: RoomSnapshot,
    pub color: Color,
    pub token: SessionToken,
}

/// One applied move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub player: Color,
    pub from: Square,
    pub to: Square,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub captured: Option<Square>,
    pub promoted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Public view of a room, broadcast after every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomCode,
    pub board: Board,
    pub turn: Color,
    pub phase: RoomPhase,
    pub players_count: usize,
    pub players: Vec<Color>,
    pub moves: Vec<MoveRecord>,
    pub must_capture: Vec<Square>,
    pub rematch_requesters: Vec<Color>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub winner: Option<Color>,
    pub draw: bool,
    pub created_at: DateTime<Utc>,
}
