//! Move generation and validation for English draughts.
//!
//! Everything here is a pure function of a [`Board`]: nothing is mutated and
//! the same inputs always give the same answers, which is what lets the room
//! re-validate every client move without trusting it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::board::{Board, Cell, Color, Square};

const RED_MAN_DIRECTIONS: [(i32, i32); 2] = [(1, 1), (1, -1)];
const BLACK_MAN_DIRECTIONS: [(i32, i32); 2] = [(-1, 1), (-1, -1)];
const KING_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Reasons a proposed move is rejected by the rules.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum MoveError {
    #[error("out of bounds")]
    OutOfBounds,
    #[error("no piece at source")]
    EmptySource,
    #[error("not your piece")]
    WrongOwner,
    #[error("destination not empty")]
    OccupiedDestination,
    #[error("must move diagonally")]
    NotDiagonal,
    #[error("piece must move forward (unless king)")]
    WrongDirection,
    #[error("no piece to capture")]
    NoPieceToCapture,
    #[error("cannot capture own piece")]
    CannotCaptureOwn,
    #[error("move too far")]
    TooFar,
    #[error("you must capture when a capture is available")]
    MustCapture,
}

impl MoveError {
    /// Stable reason code sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::OutOfBounds => "OutOfBounds",
            Self::EmptySource => "EmptySource",
            Self::WrongOwner => "WrongOwner",
            Self::OccupiedDestination => "OccupiedDestination",
            Self::NotDiagonal => "NotDiagonal",
            Self::WrongDirection => "WrongDirection",
            Self::NoPieceToCapture => "NoPieceToCapture",
            Self::CannotCaptureOwn => "CannotCaptureOwn",
            Self::TooFar => "TooFar",
            Self::MustCapture => "MustCapture",
        }
    }
}

/// What a legal move does besides relocating the piece.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MoveOutcome {
    /// Square of the jumped piece, for captures.
    pub captured: Option<Square>,
    /// Whether a man is crowned by this move.
    pub promotes: bool,
}

impl MoveOutcome {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/// Result of a finished game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Winner(Color),
    /// Neither side has a legal move.
    Draw,
}

fn directions(cell: Cell) -> &'static [(i32, i32)] {
    match cell {
        Cell::Empty => &[],
        Cell::Man(Color::Red) => &RED_MAN_DIRECTIONS,
        Cell::Man(Color::Black) => &BLACK_MAN_DIRECTIONS,
        Cell::King(_) => &KING_DIRECTIONS,
    }
}

/// Squares the piece on `from` can reach in one ply.
///
/// Yields a step onto each empty adjacent square in the piece's directions
/// and a jump over each adjacent opposing piece onto an empty square
/// behind it. Further hops of a chain are not looked ahead. An empty or
/// off-board `from` yields nothing.
pub fn legal_destinations(board: &Board, from: Square) -> impl Iterator<Item = Square> + '_ {
    let piece = board.get(from);

    directions(piece).iter().flat_map(move |&(d_row, d_col)| {
        let step = from.offset(d_row, d_col);
        let landing = from.offset(2 * d_row, 2 * d_col);

        let step_ok = step.in_bounds() && board[step].is_empty();
        let jump_ok = landing.in_bounds()
            && board[landing].is_empty()
            && board[step].owner().is_some_and(|owner| Some(owner) != piece.owner());

        [step_ok.then_some(step), jump_ok.then_some(landing)]
            .into_iter()
            .flatten()
    })
}

/// Jumps available to the piece on `from`.
pub fn legal_jumps(board: &Board, from: Square) -> impl Iterator<Item = Square> + '_ {
    legal_destinations(board, from).filter(move |&to| from.diagonal_distance(to) == Some(2))
}

/// Squares of `color`'s pieces that have at least one jump.
pub fn capture_obligations(board: &Board, color: Color) -> Vec<Square> {
    board
        .pieces(color)
        .filter(|&sq| legal_jumps(board, sq).next().is_some())
        .collect()
}

/// Whether any piece of `color` can capture. Captures are mandatory, so when
/// this holds every step move of `color` is illegal.
pub fn player_has_any_capture(board: &Board, color: Color) -> bool {
    board
        .pieces(color)
        .any(|sq| legal_jumps(board, sq).next().is_some())
}

/// Whether `color` can move at all. A side without a legal move has lost.
pub fn has_any_legal_move(board: &Board, color: Color) -> bool {
    board
        .pieces(color)
        .any(|sq| legal_destinations(board, sq).next().is_some())
}

/// Decides the game from the position alone.
pub fn outcome(board: &Board) -> Option<Outcome> {
    let red_can_move = has_any_legal_move(board, Color::Red);
    let black_can_move = has_any_legal_move(board, Color::Black);

    match (red_can_move, black_can_move) {
        (true, true) => None,
        (true, false) => Some(Outcome::Winner(Color::Red)),
        (false, true) => Some(Outcome::Winner(Color::Black)),
        (false, false) => Some(Outcome::Draw),
    }
}

/// Checks the geometry of a single move by `color` from `from` to `to`.
///
/// Forced capture is not considered here; see [`check_move`].
pub fn validate_move(
    board: &Board,
    color: Color,
    from: Square,
    to: Square,
) -> Result<MoveOutcome, MoveError> {
    if !from.in_bounds() || !to.in_bounds() {
        return Err(MoveError::OutOfBounds);
    }

    let piece = board[from];
    let owner = piece.owner().ok_or(MoveError::EmptySource)?;
    if owner != color {
        return Err(MoveError::WrongOwner);
    }
    if !board[to].is_empty() {
        return Err(MoveError::OccupiedDestination);
    }

    let distance = from.diagonal_distance(to).ok_or(MoveError::NotDiagonal)?;
    let d_row = to.row - from.row;
    let promotes = piece.promoted_at(to) != piece;

    match distance {
        1 => {
            if piece.is_man() && d_row != color.forward() {
                return Err(MoveError::WrongDirection);
            }
            Ok(MoveOutcome {
                captured: None,
                promotes,
            })
        }
        2 => {
            let middle = from.midpoint(to);
            match board[middle].owner() {
                None => Err(MoveError::NoPieceToCapture),
                Some(victim) if victim == color => Err(MoveError::CannotCaptureOwn),
                Some(_) if piece.is_man() && d_row.signum() != color.forward() => {
                    Err(MoveError::WrongDirection)
                }
                Some(_) => Ok(MoveOutcome {
                    captured: Some(middle),
                    promotes,
                }),
            }
        }
        _ => Err(MoveError::TooFar),
    }
}

/// [`validate_move`] plus mandatory capture: a non-capturing move is
/// rejected with [`MoveError::MustCapture`] whenever `color` has a jump
/// anywhere on the board.
pub fn check_move(
    board: &Board,
    color: Color,
    from: Square,
    to: Square,
) -> Result<MoveOutcome, MoveError> {
    let outcome = validate_move(board, color, from, to)?;
    if !outcome.is_capture() && player_has_any_capture(board, color) {
        return Err(MoveError::MustCapture);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: i32, col: i32) -> Square {
        Square::new(row, col)
    }

    fn sorted(mut squares: Vec<Square>) -> Vec<Square> {
        squares.sort();
        squares
    }

    // === Move generation ===

    #[test]
    fn test_red_man_moves_forward_only() {
        let board = Board::empty().with(sq(3, 2), Cell::Man(Color::Red));
        let moves = sorted(legal_destinations(&board, sq(3, 2)).collect());
        assert_eq!(moves, vec![sq(4, 1), sq(4, 3)]);
    }

    #[test]
    fn test_black_man_moves_forward_only() {
        let board = Board::empty().with(sq(4, 3), Cell::Man(Color::Black));
        let moves = sorted(legal_destinations(&board, sq(4, 3)).collect());
        assert_eq!(moves, vec![sq(3, 2), sq(3, 4)]);
    }

    #[test]
    fn test_king_moves_in_all_directions() {
        let board = Board::empty().with(sq(3, 2), Cell::King(Color::Black));
        let moves = sorted(legal_destinations(&board, sq(3, 2)).collect());
        assert_eq!(moves, vec![sq(2, 1), sq(2, 3), sq(4, 1), sq(4, 3)]);
    }

    #[test]
    fn test_edge_piece_has_one_step() {
        let board = Board::empty().with(sq(2, 7), Cell::Man(Color::Red));
        let moves: Vec<_> = legal_destinations(&board, sq(2, 7)).collect();
        assert_eq!(moves, vec![sq(3, 6)]);
    }

    #[test]
    fn test_jump_over_opponent() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Black));
        let moves = sorted(legal_destinations(&board, sq(2, 1)).collect());
        assert_eq!(moves, vec![sq(3, 0), sq(4, 3)]);
        assert_eq!(legal_jumps(&board, sq(2, 1)).collect::<Vec<_>>(), vec![sq(4, 3)]);
    }

    #[test]
    fn test_no_jump_over_own_piece_or_onto_occupied() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Red))
            .with(sq(3, 0), Cell::Man(Color::Black))
            .with(sq(4, 3), Cell::Man(Color::Black));
        assert_eq!(legal_destinations(&board, sq(2, 1)).count(), 0);
    }

    #[test]
    fn test_no_jump_off_board() {
        let board = Board::empty()
            .with(sq(5, 6), Cell::Man(Color::Red))
            .with(sq(6, 7), Cell::Man(Color::Black));
        let moves: Vec<_> = legal_destinations(&board, sq(5, 6)).collect();
        assert_eq!(moves, vec![sq(6, 5)]);
    }

    #[test]
    fn test_empty_and_off_board_sources_yield_nothing() {
        let board = Board::initial();
        assert_eq!(legal_destinations(&board, sq(3, 0)).count(), 0);
        assert_eq!(legal_destinations(&board, sq(-1, 2)).count(), 0);
        assert_eq!(legal_destinations(&board, sq(8, 8)).count(), 0);
    }

    #[test]
    fn test_initial_position_has_moves_but_no_captures() {
        let board = Board::initial();
        for color in Color::ALL {
            assert!(has_any_legal_move(&board, color));
            assert!(!player_has_any_capture(&board, color));
            assert!(capture_obligations(&board, color).is_empty());
        }
        assert_eq!(outcome(&board), None);
    }

    #[test]
    fn test_capture_obligations_lists_capturing_pieces() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(2, 5), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Black));
        assert_eq!(capture_obligations(&board, Color::Red), vec![sq(2, 1)]);
        assert!(player_has_any_capture(&board, Color::Red));
        // Black can take back over (2, 1) as well.
        assert_eq!(capture_obligations(&board, Color::Black), vec![sq(3, 2)]);
    }

    // === Validation ===

    #[test]
    fn test_validate_rejection_reasons() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Red))
            .with(sq(5, 2), Cell::Man(Color::Black));

        let cases = [
            (sq(2, 1), sq(-1, 4), MoveError::OutOfBounds),
            (sq(8, 1), sq(3, 0), MoveError::OutOfBounds),
            (sq(4, 1), sq(5, 0), MoveError::EmptySource),
            (sq(5, 2), sq(4, 1), MoveError::WrongOwner),
            (sq(2, 1), sq(3, 2), MoveError::OccupiedDestination),
            (sq(2, 1), sq(3, 1), MoveError::NotDiagonal),
            (sq(3, 2), sq(2, 3), MoveError::WrongDirection),
            (sq(3, 2), sq(5, 0), MoveError::NoPieceToCapture),
            (sq(2, 1), sq(4, 3), MoveError::CannotCaptureOwn),
            (sq(2, 1), sq(5, 4), MoveError::TooFar),
        ];

        for (from, to, expected) in cases {
            assert_eq!(
                validate_move(&board, Color::Red, from, to),
                Err(expected),
                "{from} -> {to}"
            );
        }
    }

    #[test]
    fn test_validate_step_and_capture() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Black));

        let step = validate_move(&board, Color::Red, sq(2, 1), sq(3, 0)).unwrap();
        assert_eq!(step, MoveOutcome::default());

        let jump = validate_move(&board, Color::Red, sq(2, 1), sq(4, 3)).unwrap();
        assert_eq!(jump.captured, Some(sq(3, 2)));
        assert!(!jump.promotes);
    }

    #[test]
    fn test_validate_reports_promotion() {
        let board = Board::empty()
            .with(sq(6, 1), Cell::Man(Color::Red))
            .with(sq(2, 3), Cell::Man(Color::Black))
            .with(sq(1, 4), Cell::Man(Color::Red));

        assert!(validate_move(&board, Color::Red, sq(6, 1), sq(7, 2)).unwrap().promotes);
        let capture = validate_move(&board, Color::Black, sq(2, 3), sq(0, 5)).unwrap();
        assert!(capture.promotes);
        assert_eq!(capture.captured, Some(sq(1, 4)));
    }

    #[test]
    fn test_king_never_reports_promotion() {
        let board = Board::empty().with(sq(6, 1), Cell::King(Color::Red));
        let outcome = validate_move(&board, Color::Red, sq(6, 1), sq(7, 0)).unwrap();
        assert!(!outcome.promotes);
    }

    #[test]
    fn test_king_may_step_backwards() {
        let board = Board::empty().with(sq(4, 3), Cell::King(Color::Red));
        assert!(validate_move(&board, Color::Red, sq(4, 3), sq(3, 2)).is_ok());
    }

    #[test]
    fn test_man_cannot_capture_backwards() {
        let board = Board::empty()
            .with(sq(4, 3), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Black));
        assert_eq!(
            validate_move(&board, Color::Red, sq(4, 3), sq(2, 1)),
            Err(MoveError::WrongDirection)
        );
    }

    #[test]
    fn test_check_move_enforces_forced_capture() {
        let board = Board::empty()
            .with(sq(2, 1), Cell::Man(Color::Red))
            .with(sq(2, 5), Cell::Man(Color::Red))
            .with(sq(3, 2), Cell::Man(Color::Black));

        // The step is geometrically fine but another piece can capture.
        assert!(validate_move(&board, Color::Red, sq(2, 5), sq(3, 6)).is_ok());
        assert_eq!(
            check_move(&board, Color::Red, sq(2, 5), sq(3, 6)),
            Err(MoveError::MustCapture)
        );
        assert!(check_move(&board, Color::Red, sq(2, 1), sq(4, 3)).is_ok());
    }

    // === Outcome ===

    #[test]
    fn test_no_pieces_loses() {
        let board = Board::empty().with(sq(2, 1), Cell::Man(Color::Red));
        assert_eq!(outcome(&board), Some(Outcome::Winner(Color::Red)));
    }

    #[test]
    fn test_blocked_pieces_lose() {
        // Black man on (7, 0) faces a red man on (6, 1) backed by (5, 2).
        let board = Board::empty()
            .with(sq(7, 0), Cell::Man(Color::Black))
            .with(sq(6, 1), Cell::Man(Color::Red))
            .with(sq(5, 2), Cell::Man(Color::Red));
        assert!(!has_any_legal_move(&board, Color::Black));
        assert_eq!(outcome(&board), Some(Outcome::Winner(Color::Red)));
    }

    #[test]
    fn test_neither_side_moving_is_a_draw() {
        assert_eq!(outcome(&Board::empty()), Some(Outcome::Draw));
    }

    #[test]
    fn test_move_error_reason_codes() {
        assert_eq!(MoveError::MustCapture.reason(), "MustCapture");
        assert_eq!(MoveError::OutOfBounds.to_string(), "out of bounds");
    }
}
