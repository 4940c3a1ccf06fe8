use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Number of rows and columns on the board.
pub const BOARD_SIZE: i32 = 8;

/// Rows filled with men at the start of a game, per side.
const STARTING_ROWS: i32 = 3;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Red, Color::Black];

    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Black,
            Self::Black => Self::Red,
        }
    }

    /// Row delta of a forward move for this color's men.
    pub fn forward(self) -> i32 {
        match self {
            Self::Red => 1,
            Self::Black => -1,
        }
    }

    /// Row on which this color's men are crowned.
    pub fn promotion_row(self) -> i32 {
        match self {
            Self::Red => BOARD_SIZE - 1,
            Self::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Red => "red",
            Self::Black => "black",
        };
        write!(f, "{repr}")
    }
}

/// A board coordinate. Coordinates are signed so that off-board input
/// coming from clients can be represented and rejected.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Square {
    pub row: i32,
    pub col: i32,
}

impl Square {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (0..BOARD_SIZE).contains(&self.row) && (0..BOARD_SIZE).contains(&self.col)
    }

    /// Playable squares are the dark ones, where `row + col` is odd.
    pub fn is_dark(self) -> bool {
        (self.row + self.col) % 2 != 0
    }

    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    /// Square halfway between `self` and `other`. Only meaningful for jumps.
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.row + other.row) / 2, (self.col + other.col) / 2)
    }

    /// Diagonal distance to `other`, or `None` if the squares don't share a diagonal.
    pub fn diagonal_distance(self, other: Self) -> Option<i32> {
        let d_row = (other.row - self.row).abs();
        let d_col = (other.col - self.col).abs();
        (d_row == d_col).then_some(d_row)
    }

    /// Every square on the board, row by row.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Square::new(row, col)))
    }
}

impl From<[i32; 2]> for Square {
    fn from([row, col]: [i32; 2]) -> Self {
        Self::new(row, col)
    }
}

impl From<Square> for [i32; 2] {
    fn from(square: Square) -> Self {
        [square.row, square.col]
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Contents of a single board square.
///
/// On the wire a cell is its symbol: `null` for an empty square, `r`/`b`
/// for men and `R`/`B` for kings.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "Option<char>", try_from = "Option<char>")]
pub enum Cell {
    #[default]
    Empty,
    Man(Color),
    King(Color),
}

impl Cell {
    pub fn owner(self) -> Option<Color> {
        match self {
            Self::Empty => None,
            Self::Man(color) | Self::King(color) => Some(color),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    pub fn is_king(self) -> bool {
        matches!(self, Self::King(_))
    }

    pub fn is_man(self) -> bool {
        matches!(self, Self::Man(_))
    }

    /// The piece after landing on `square`: men reaching their far row are crowned.
    pub fn promoted_at(self, square: Square) -> Self {
        match self {
            Self::Man(color) if square.row == color.promotion_row() => Self::King(color),
            other => other,
        }
    }

    pub fn symbol(self) -> Option<char> {
        match self {
            Self::Empty => None,
            Self::Man(Color::Red) => Some('r'),
            Self::Man(Color::Black) => Some('b'),
            Self::King(Color::Red) => Some('R'),
            Self::King(Color::Black) => Some('B'),
        }
    }
}

impl From<Cell> for Option<char> {
    fn from(cell: Cell) -> Self {
        cell.symbol()
    }
}

impl TryFrom<Option<char>> for Cell {
    type Error = String;

    fn try_from(symbol: Option<char>) -> Result<Self, Self::Error> {
        match symbol {
            None => Ok(Self::Empty),
            Some('r') => Ok(Self::Man(Color::Red)),
            Some('b') => Ok(Self::Man(Color::Black)),
            Some('R') => Ok(Self::King(Color::Red)),
            Some('B') => Ok(Self::King(Color::Black)),
            Some(other) => Err(format!("unknown cell symbol {other:?}")),
        }
    }
}

/// An 8×8 checkers board, row 0 first. Red starts on rows 0-2.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE as usize]; BOARD_SIZE as usize],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE as usize]; BOARD_SIZE as usize],
        }
    }

    /// The standard starting position.
    pub fn initial() -> Self {
        let mut board = Self::empty();
        for square in Square::all().filter(|sq| sq.is_dark()) {
            if square.row < STARTING_ROWS {
                board[square] = Cell::Man(Color::Red);
            } else if square.row >= BOARD_SIZE - STARTING_ROWS {
                board[square] = Cell::Man(Color::Black);
            }
        }
        board
    }

    /// Cell at `square`; off-board squares read as empty.
    pub fn get(&self, square: Square) -> Cell {
        if square.in_bounds() {
            self[square]
        } else {
            Cell::Empty
        }
    }

    /// Places `cell` on `square`, returning the board for chaining.
    /// Intended for building positions; callers must pick dark squares.
    pub fn with(mut self, square: Square, cell: Cell) -> Self {
        self[square] = cell;
        self
    }

    /// Returns the board after moving the piece on `from` to `to`.
    ///
    /// The piece is crowned when it lands on its far row and, when the move
    /// spans two diagonals, the jumped square is cleared. `self` is left
    /// untouched. No legality checks are done here; see
    /// [`super::rules::validate_move`].
    pub fn apply_move(&self, from: Square, to: Square) -> Self {
        let mut next = *self;
        let piece = next[from];
        next[from] = Cell::Empty;
        next[to] = piece.promoted_at(to);

        if from.diagonal_distance(to) == Some(2) {
            next[from.midpoint(to)] = Cell::Empty;
        }

        next
    }

    /// Squares holding a piece of `color`.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = Square> + '_ {
        Square::all().filter(move |&sq| self[sq].owner() == Some(color))
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces(color).count()
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE as usize]; BOARD_SIZE as usize] {
        &self.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl Index<Square> for Board {
    type Output = Cell;

    fn index(&self, square: Square) -> &Self::Output {
        &self.cells[square.row as usize][square.col as usize]
    }
}

impl IndexMut<Square> for Board {
    fn index_mut(&mut self, square: Square) -> &mut Self::Output {
        &mut self.cells[square.row as usize][square.col as usize]
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.iter().rev() {
            let line: String = row.iter().map(|cell| cell.symbol().unwrap_or('.')).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
