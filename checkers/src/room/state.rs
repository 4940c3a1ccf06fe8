//! Synchronous state of a single two-player match.
//!
//! [`Room`] knows nothing about channels or tasks; the actor feeds it one
//! command at a time and broadcasts whatever it returns.

use super::{
    code::RoomCode,
    errors::RoomError,
    messages::{MoveRecord, RoomSnapshot},
};
use crate::{
    game::{self, Board, Color, Outcome, Square},
    session::ConnectionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    ops::{Index, IndexMut},
};

/// Where a room is in its lifecycle.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomPhase {
    /// Both seats have not been filled yet
    Waiting,
    InProgress,
    /// A winner or a draw has been decided
    Finished,
}

/// One of the two seats of a room.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Seat {
    /// Live connection sitting here
    pub connection: Option<ConnectionId>,
    /// Claimed by an issued session token; survives disconnects
    pub reserved: bool,
    /// Advances every time the seat changes hands
    pub epoch: u64,
}

impl Seat {
    pub fn is_occupied(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_free(&self) -> bool {
        !self.is_occupied() && !self.reserved
    }
}

/// A seat as held at one point in time.
///
/// Session tokens carry a claim; one whose epoch no longer matches the
/// seat was issued to an earlier holder.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SeatClaim {
    pub color: Color,
    pub epoch: u64,
}

/// The red and black seats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Seats {
    red: Seat,
    black: Seat,
}

impl Seats {
    /// Color of the seat `connection` sits in
    pub fn color_of(&self, connection: ConnectionId) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&color| self[color].connection == Some(connection))
    }

    /// Colors with a live occupant, red first
    pub fn occupied(&self) -> impl Iterator<Item = Color> + '_ {
        Color::ALL
            .into_iter()
            .filter(|&color| self[color].is_occupied())
    }

    pub fn occupant_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn claim(&self, color: Color) -> SeatClaim {
        SeatClaim {
            color,
            epoch: self[color].epoch,
        }
    }
}

impl Index<Color> for Seats {
    type Output = Seat;

    fn index(&self, color: Color) -> &Seat {
        match color {
            Color::Red => &self.red,
            Color::Black => &self.black,
        }
    }
}

impl IndexMut<Color> for Seats {
    fn index_mut(&mut self, color: Color) -> &mut Seat {
        match color {
            Color::Red => &mut self.red,
            Color::Black => &mut self.black,
        }
    }
}

/// A match between two seats.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomCode,
    board: Board,
    turn: Color,
    history: Vec<MoveRecord>,
    seats: Seats,
    rematch_votes: BTreeSet<Color>,
    /// Square of the piece that must keep capturing
    chain: Option<Square>,
    /// Both seats have been filled at least once
    started: bool,
    created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomCode) -> Self {
        Self {
            id,
            board: Board::initial(),
            turn: Color::Red,
            history: Vec::new(),
            seats: Seats::default(),
            rematch_votes: BTreeSet::new(),
            chain: None,
            started: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &RoomCode {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn seats(&self) -> &Seats {
        &self.seats
    }

    pub fn chain(&self) -> Option<Square> {
        self.chain
    }

    pub fn is_empty(&self) -> bool {
        self.seats.occupant_count() == 0
    }

    /// Winner or draw, derived from the board
    pub fn outcome(&self) -> Option<Outcome> {
        game::outcome(&self.board)
    }

    pub fn phase(&self) -> RoomPhase {
        if !self.started {
            RoomPhase::Waiting
        } else if self.outcome().is_some() {
            RoomPhase::Finished
        } else {
            RoomPhase::InProgress
        }
    }

    /// Pieces of the side to move that are obliged to capture.
    pub fn must_capture(&self) -> Vec<Square> {
        if self.outcome().is_some() {
            return Vec::new();
        }
        match self.chain {
            Some(square) => vec![square],
            None => game::capture_obligations(&self.board, self.turn),
        }
    }

    /// Seat `connection`, preferring a seat nobody holds over one whose
    /// holder has disconnected. Red is tried first in both cases.
    ///
    /// Taking over a disconnected seat advances its epoch, so the previous
    /// holder's token stops working. Joining again from a seated connection
    /// returns its current claim.
    pub fn join(&mut self, connection: ConnectionId) -> Result<SeatClaim, RoomError> {
        if let Some(color) = self.seats.color_of(connection) {
            return Ok(self.seats.claim(color));
        }

        let color = Color::ALL
            .into_iter()
            .find(|&color| self.seats[color].is_free())
            .or_else(|| {
                Color::ALL
                    .into_iter()
                    .find(|&color| !self.seats[color].is_occupied())
            })
            .ok_or(RoomError::RoomFull)?;

        let seat = &mut self.seats[color];
        seat.connection = Some(connection);
        seat.reserved = true;
        seat.epoch += 1;

        self.mark_started();
        Ok(self.seats.claim(color))
    }

    /// Put `connection` in the seat of `claim`, whatever was sitting there.
    ///
    /// # Returns
    ///
    /// * `Ok(Option<ConnectionId>)` - The stale connection that was displaced
    /// * `Err(RoomError::InvalidToken)` - The seat has changed hands since
    pub fn reattach(
        &mut self,
        connection: ConnectionId,
        claim: SeatClaim,
    ) -> Result<Option<ConnectionId>, RoomError> {
        if self.seats.claim(claim.color) != claim {
            return Err(RoomError::InvalidToken);
        }

        if let Some(current) = self.seats.color_of(connection)
            && current != claim.color
        {
            self.vacate(connection);
        }

        let seat = &mut self.seats[claim.color];
        let displaced = seat
            .connection
            .replace(connection)
            .filter(|&previous| previous != connection);
        seat.reserved = true;

        self.mark_started();
        Ok(displaced)
    }

    /// Remove `connection` from its seat, keeping the reservation.
    pub fn vacate(&mut self, connection: ConnectionId) -> Option<Color> {
        let color = self.seats.color_of(connection)?;
        self.seats[color].connection = None;
        self.rematch_votes.remove(&color);
        if self.is_empty() {
            self.rematch_votes.clear();
        }
        Some(color)
    }

    /// Remove `connection` from its seat and give the seat up.
    ///
    /// # Returns
    ///
    /// * `Option<SeatClaim>` - The released seat with its advanced epoch
    pub fn release(&mut self, connection: ConnectionId) -> Option<SeatClaim> {
        let color = self.vacate(connection)?;
        let seat = &mut self.seats[color];
        seat.reserved = false;
        seat.epoch += 1;
        Some(self.seats.claim(color))
    }

    /// Where the piece at `from` may go, as seen by `connection`.
    pub fn allowed_moves(
        &self,
        connection: ConnectionId,
        from: Square,
    ) -> Result<Vec<Square>, RoomError> {
        let color = self.seats.color_of(connection).ok_or(RoomError::NotAPlayer)?;

        if self.board.get(from).owner() != Some(color) {
            return Ok(Vec::new());
        }
        if let Some(chain) = self.chain
            && color == self.turn
            && chain != from
        {
            return Ok(Vec::new());
        }

        let mut moves: Vec<Square> = game::legal_destinations(&self.board, from).collect();
        if game::player_has_any_capture(&self.board, color) {
            moves.retain(|&to| from.diagonal_distance(to) == Some(2));
        }
        Ok(moves)
    }

    /// Validate and apply a move by `connection`.
    pub fn make_move(
        &mut self,
        connection: ConnectionId,
        from: Square,
        to: Square,
        at: DateTime<Utc>,
    ) -> Result<MoveRecord, RoomError> {
        let color = self.seats.color_of(connection).ok_or(RoomError::NotAPlayer)?;
        if self.phase() != RoomPhase::InProgress {
            return Err(RoomError::GameNotInProgress);
        }
        if color != self.turn {
            return Err(RoomError::NotYourTurn);
        }
        if let Some(chain) = self.chain.filter(|&chain| chain != from) {
            return Err(RoomError::MustContinueChain(chain));
        }

        let outcome = game::check_move(&self.board, color, from, to)?;
        self.board = self.board.apply_move(from, to);

        let record = MoveRecord {
            player: color,
            from,
            to,
            captured: outcome.captured,
            promoted: outcome.promotes,
            timestamp: at,
        };
        self.history.push(record.clone());

        if outcome.is_capture() && game::legal_jumps(&self.board, to).next().is_some() {
            self.chain = Some(to);
        } else {
            self.chain = None;
            self.turn = color.opponent();
        }

        Ok(record)
    }

    /// Record a rematch vote by `connection`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Every occupant has voted and the room was reset
    /// * `Ok(false)` - The vote was recorded
    pub fn request_rematch(&mut self, connection: ConnectionId) -> Result<bool, RoomError> {
        let color = self.seats.color_of(connection).ok_or(RoomError::NotInRoom)?;
        self.rematch_votes.insert(color);

        let unanimous = self
            .seats
            .occupied()
            .all(|color| self.rematch_votes.contains(&color));
        if unanimous {
            self.reset();
        }
        Ok(unanimous)
    }

    pub fn cancel_rematch(&mut self, connection: ConnectionId) -> Result<(), RoomError> {
        let color = self.seats.color_of(connection).ok_or(RoomError::NotInRoom)?;
        self.rematch_votes.remove(&color);
        Ok(())
    }

    /// Fresh board, empty history, red to move. Seats and id are kept.
    pub fn reset(&mut self) {
        self.board = Board::initial();
        self.turn = Color::Red;
        self.history.clear();
        self.rematch_votes.clear();
        self.chain = None;
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let outcome = self.outcome();
        RoomSnapshot {
            id: self.id.clone(),
            board: self.board,
            turn: self.turn,
            phase: self.phase(),
            players_count: self.seats.occupant_count(),
            players: self.seats.occupied().collect(),
            moves: self.history.clone(),
            must_capture: self.must_capture(),
            rematch_requesters: self.rematch_votes.iter().copied().collect(),
            winner: match outcome {
                Some(Outcome::Winner(color)) => Some(color),
                _ => None,
            },
            draw: outcome == Some(Outcome::Draw),
            created_at: self.created_at,
        }
    }

    fn mark_started(&mut self) {
        if Color::ALL
            .into_iter()
            .all(|color| self.seats[color].is_occupied())
        {
            self.started = true;
        }
    }

    #[cfg(test)]
    pub(crate) fn set_position(&mut self, board: Board, turn: Color) {
        self.board = board;
        self.turn = turn;
        self.chain = None;
    }
}
