//! Checkers game engine - board and rules.
//!
//! This module provides the pure, synchronous part of the server:
//! - Board, piece and coordinate types
//! - Legal move generation and mandatory capture
//! - Move validation and application
//! - Win and draw detection

pub mod board;
pub mod rules;

pub use board::{BOARD_SIZE, Board, Cell, Color, Square};
pub use rules::{
    MoveError, MoveOutcome, Outcome, capture_obligations, check_move, has_any_legal_move,
    legal_destinations, legal_jumps, outcome, player_has_any_capture, validate_move,
};
