//! Search for the renza gomoku engine: threat-aware move generation,
//! threat-space solving, and MCTS with batched evaluation.

mod action;
mod config;
mod control;
mod driver;
mod eval;
pub mod mcts;
mod movegen;
pub mod tss;

pub use action::{Action, ActionList, ActionStack};
pub use config::EngineConfig;
pub use control::SearchControl;
pub use driver::{RealtimeEvent, SearchDriver, SearchReport};
pub use eval::{EvalOutput, EvalRequest, Evaluator, UniformEvaluator};
pub use mcts::{EdgeSelector, ProvenValue, Value};
pub use movegen::{GeneratorMode, MoveGenerator};
pub use tss::{SharedHashTable, TssConfig, TssSolver};
