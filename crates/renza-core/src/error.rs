//! Error types for board construction and rule parsing.

/// Errors from building or mutating a [`Board`](crate::board::Board).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Requested dimensions fall outside the supported range.
    #[error("board size {rows}x{cols} outside supported range 5..=20")]
    InvalidSize {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },
    /// An unrecognised character appeared in an ASCII board fixture.
    #[error("invalid board character: '{character}'")]
    InvalidChar {
        /// The offending character.
        character: char,
    },
    /// A fixture row has a different width than the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Cells found in this row.
        found: usize,
        /// Cells expected per row.
        expected: usize,
    },
    /// A move targets a cell that is not empty.
    #[error("cell ({row},{col}) is not empty")]
    Occupied {
        /// Target row.
        row: u8,
        /// Target column.
        col: u8,
    },
    /// A coordinate lies outside the board.
    #[error("cell ({row},{col}) outside {rows}x{cols} board")]
    OutOfBounds {
        /// Target row.
        row: i32,
        /// Target column.
        col: i32,
        /// Board rows.
        rows: usize,
        /// Board columns.
        cols: usize,
    },
}

/// Errors from parsing rule identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// Numeric protocol rule value not in the supported set.
    #[error("unknown rule number {value}")]
    UnknownRuleNumber {
        /// The value received.
        value: u32,
    },
    /// Textual rule name not recognised.
    #[error("unknown rule name \"{name}\"")]
    UnknownRuleName {
        /// The name received.
        name: String,
    },
}
