//! The rectangular board: stone placement and ASCII fixtures.

use std::fmt;
use std::str::FromStr;

use crate::error::BoardError;
use crate::location::{Loc, Move};
use crate::sign::Sign;
use crate::zobrist;

/// Largest supported board edge.
pub const MAX_BOARD_SIZE: usize = 20;
/// Smallest supported board edge.
pub const MIN_BOARD_SIZE: usize = 5;

/// A rectangular gomoku board, row-major.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Sign>,
}

impl Board {
    /// Create an empty board.
    pub fn empty(rows: usize, cols: usize) -> Result<Board, BoardError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&rows)
            || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&cols)
        {
            return Err(BoardError::InvalidSize { rows, cols });
        }
        Ok(Board { rows, cols, cells: vec![Sign::None; rows * cols] })
    }

    /// Square shorthand for the common 15x15 and 20x20 cases.
    pub fn square(size: usize) -> Result<Board, BoardError> {
        Board::empty(size, size)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn contains(&self, row: i32, col: i32) -> bool {
        (0..self.rows as i32).contains(&row) && (0..self.cols as i32).contains(&col)
    }

    #[inline]
    pub fn at(&self, loc: Loc) -> Sign {
        self.cells[loc.row as usize * self.cols + loc.col as usize]
    }

    #[inline]
    pub fn is_empty_at(&self, loc: Loc) -> bool {
        self.at(loc) == Sign::None
    }

    /// Place a stone, failing on occupied or out-of-range cells.
    pub fn put(&mut self, mv: Move) -> Result<(), BoardError> {
        if !self.contains(mv.loc.row as i32, mv.loc.col as i32) {
            return Err(BoardError::OutOfBounds {
                row: mv.loc.row as i32,
                col: mv.loc.col as i32,
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !self.is_empty_at(mv.loc) {
            return Err(BoardError::Occupied { row: mv.loc.row, col: mv.loc.col });
        }
        self.cells[mv.loc.row as usize * self.cols + mv.loc.col as usize] = mv.sign;
        Ok(())
    }

    /// Remove a stone. Used by protocol takeback handling.
    pub fn clear_at(&mut self, loc: Loc) {
        self.cells[loc.row as usize * self.cols + loc.col as usize] = Sign::None;
    }

    /// Number of stones on the board.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_stone()).count()
    }

    /// Whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_stone())
    }

    /// Iterate over all cell positions.
    pub fn locations(&self) -> impl Iterator<Item = Loc> + '_ {
        let cols = self.cols;
        (0..self.rows * self.cols).map(move |i| Loc::new((i / cols) as u8, (i % cols) as u8))
    }

    /// Zobrist hash of the placed stones, independent of move order.
    pub fn hash(&self) -> u64 {
        zobrist::hash_board(self)
    }

    /// Build a board from ASCII rows such as `"X _ _ O _"`.
    ///
    /// Whitespace between cells is optional; `!` and `.` read as empty,
    /// which lets fixtures mark expected moves without affecting state.
    pub fn from_rows(rows: &[&str]) -> Result<Board, BoardError> {
        let parsed: Vec<Vec<Sign>> = rows
            .iter()
            .map(|line| {
                line.chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| Sign::from_char(c).ok_or(BoardError::InvalidChar { character: c }))
                    .collect()
            })
            .collect::<Result<_, _>>()?;

        let height = parsed.len();
        let width = parsed.first().map_or(0, Vec::len);
        for (i, row) in parsed.iter().enumerate() {
            if row.len() != width {
                return Err(BoardError::RaggedRow { row: i, found: row.len(), expected: width });
            }
        }

        let mut board = Board::empty(height, width)?;
        for (r, row) in parsed.into_iter().enumerate() {
            for (c, sign) in row.into_iter().enumerate() {
                if sign.is_stone() {
                    board.cells[r * width + c] = sign;
                }
            }
        }
        Ok(board)
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
        Board::from_rows(&rows)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.cells[r * self.cols + c])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({}x{}, {} stones)", self.rows, self.cols, self.stone_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board() {
        let board = Board::square(15).unwrap();
        assert_eq!(board.rows(), 15);
        assert_eq!(board.stone_count(), 0);
        assert!(!board.is_full());
    }

    #[test]
    fn size_bounds() {
        assert!(Board::square(4).is_err());
        assert!(Board::square(21).is_err());
        assert!(Board::square(20).is_ok());
    }

    #[test]
    fn put_and_clear() {
        let mut board = Board::square(5).unwrap();
        let mv = Move::new(Sign::Cross, Loc::new(2, 3));
        board.put(mv).unwrap();
        assert_eq!(board.at(Loc::new(2, 3)), Sign::Cross);
        assert!(board.put(Move::new(Sign::Circle, Loc::new(2, 3))).is_err());
        board.clear_at(Loc::new(2, 3));
        assert!(board.is_empty_at(Loc::new(2, 3)));
    }

    #[test]
    fn from_rows_fixture() {
        let board = Board::from_rows(&[
            "X _ _ _ _",
            "X _ _ _ _",
            "X _ _ _ _",
            "X _ _ _ _",
            "! _ O _ _",
        ])
        .unwrap();
        assert_eq!(board.at(Loc::new(0, 0)), Sign::Cross);
        assert_eq!(board.at(Loc::new(4, 2)), Sign::Circle);
        // '!' is an annotation, not a stone
        assert_eq!(board.at(Loc::new(4, 0)), Sign::None);
        assert_eq!(board.stone_count(), 5);
    }

    #[test]
    fn ragged_fixture_rejected() {
        assert!(Board::from_rows(&["X _ _ _ _", "X _ _"]).is_err());
    }

    #[test]
    fn hash_is_order_independent() {
        let mut a = Board::square(9).unwrap();
        let mut b = Board::square(9).unwrap();
        a.put(Move::new(Sign::Cross, Loc::new(1, 1))).unwrap();
        a.put(Move::new(Sign::Circle, Loc::new(2, 2))).unwrap();
        b.put(Move::new(Sign::Circle, Loc::new(2, 2))).unwrap();
        b.put(Move::new(Sign::Cross, Loc::new(1, 1))).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), Board::square(9).unwrap().hash());
    }
}
