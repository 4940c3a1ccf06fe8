//! Errors returned by room operations.

use thiserror::Error;

use crate::game::{MoveError, Square};

/// Why a room command was rejected.
///
/// A rejected command never changes room state, and the error is reported
/// to the requester only.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RoomError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("you are not a player in this room")]
    NotAPlayer,
    #[error("you are not in a room")]
    NotInRoom,
    #[error("not your turn")]
    NotYourTurn,
    #[error("game is not in progress")]
    GameNotInProgress,
    #[error("you must continue capturing with the piece at {0}")]
    MustContinueChain(Square),
    #[error(transparent)]
    IllegalMove(#[from] MoveError),
    #[error("internal error")]
    Internal,
}

impl RoomError {
    /// Stable reason code sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::RoomNotFound => "RoomNotFound",
            Self::RoomFull => "RoomFull",
            Self::InvalidToken => "InvalidToken",
            Self::NotAPlayer => "NotAPlayer",
            Self::NotInRoom => "NotInRoom",
            Self::NotYourTurn => "NotYourTurn",
            Self::GameNotInProgress => "GameNotInProgress",
            Self::MustContinueChain(_) => "MustContinueChain",
            Self::IllegalMove(err) => err.reason(),
            Self::Internal => "Internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violations_keep_their_reason() {
        let err = RoomError::from(MoveError::MustCapture);
        assert_eq!(err.reason(), "MustCapture");
        assert_eq!(err.to_string(), MoveError::MustCapture.to_string());
    }

    #[test]
    fn test_chain_message_names_square() {
        let err = RoomError::MustContinueChain(Square::new(4, 3));
        assert_eq!(err.reason(), "MustContinueChain");
        assert!(err.to_string().contains("(4, 3)"));
    }
}
