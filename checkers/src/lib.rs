//! # Checkers
//!
//! An authoritative engine for two-player English draughts matches played in
//! short-lived rooms.
//!
//! Clients never apply moves themselves: every move is re-validated here
//! against the board, turn and forced-capture rule before it is applied, and
//! the resulting state is pushed to both players.
//!
//! ## Core Modules
//!
//! - [`game`]: Board representation, move generation, validation and outcome
//! - [`room`]: Room state machine, room actors and the room directory
//! - [`session`]: Reconnection tokens and connection identifiers
//! - [`net`]: JSON protocol messages and per-connection command dispatch
//!
//! ## Example
//!
//! ```
//! use checkers::game::{Board, Color, Square, check_move};
//!
//! let board = Board::initial();
//! let outcome = check_move(&board, Color::Red, Square::new(2, 1), Square::new(3, 2)).unwrap();
//! assert!(!outcome.is_capture());
//! ```

/// Board, pieces and the rules of the game.
pub mod game;
pub use game::{Board, Cell, Color, MoveError, Outcome, Square};

/// JSON protocol and command dispatch.
pub mod net;
pub use net::{ClientCommand, Connection, ServerMessage};

/// Rooms and their lifecycle.
pub mod room;
pub use room::{RoomCode, RoomConfig, RoomDirectory, RoomError, RoomSnapshot};

/// Reconnection sessions.
pub mod session;
pub use session::{ConnectionId, SessionToken};
