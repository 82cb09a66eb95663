//! Core types for the renza gomoku engine: rules, board state, the
//! per-rule pattern tables, and the incremental pattern calculator.

mod board;
mod calculator;
mod error;
mod location;
mod pattern;
mod rules;
mod score;
mod sign;
mod threat;
pub mod zobrist;

pub use board::{Board, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
pub use calculator::{DirectionGroup, PatternCalculator};
pub use error::{BoardError, RulesError};
pub use location::{Direction, Loc, LocList, Move};
pub use pattern::{PatternEntry, PatternTable, PatternType, Window};
pub use rules::GameRules;
pub use score::{Score, EVAL_LIMIT};
pub use sign::Sign;
pub use threat::{aggregate_threat, ThreatHistogram, ThreatType};
