//! Threat-space search: recursive resolution of forced sequences.

mod table;

pub use table::{SharedHashTable, MIN_HASH_MB};

use std::sync::Arc;

use tracing::trace;

use renza_core::{Move, PatternCalculator, Score};

use crate::action::ActionStack;
use crate::movegen::{GeneratorMode, MoveGenerator};

/// Bounds for one `solve` call.
#[derive(Debug, Clone, Copy)]
pub struct TssConfig {
    /// Positions visited before the search gives up with `unknown`.
    pub max_positions: usize,
    /// Recursion depth cap in plies.
    pub max_depth: usize,
    /// Generator mode used at every node.
    pub mode: GeneratorMode,
}

impl Default for TssConfig {
    fn default() -> TssConfig {
        TssConfig { max_positions: 1000, max_depth: 50, mode: GeneratorMode::Threats }
    }
}

/// Recursive negamax over generator output.
///
/// Running out of budget is not an error: the node is reported
/// `unknown` and the caller falls back to its evaluator.
pub struct TssSolver {
    table: Arc<SharedHashTable>,
    stack: ActionStack,
    movegen: MoveGenerator,
    config: TssConfig,
    positions: usize,
}

impl TssSolver {
    pub fn new(config: TssConfig, table: Arc<SharedHashTable>, rows: usize, cols: usize) -> TssSolver {
        TssSolver {
            table,
            stack: ActionStack::new(),
            movegen: MoveGenerator::new(rows, cols),
            config,
            positions: 0,
        }
    }

    pub fn table(&self) -> &Arc<SharedHashTable> {
        &self.table
    }

    /// Positions visited by the most recent `solve`.
    pub fn last_position_count(&self) -> usize {
        self.positions
    }

    /// Try to prove the position for the side to move.
    ///
    /// The calculator is returned in exactly the state it was given:
    /// every `add_move` on the search path is paired with an
    /// `undo_move`.
    pub fn solve(&mut self, calc: &mut PatternCalculator) -> Score {
        self.table.new_generation();
        self.positions = 0;
        let entry_hash = calc.hash();
        let entry_depth = calc.current_depth();

        let score = self.recurse(calc, 0);

        debug_assert_eq!(calc.hash(), entry_hash, "solver left the calculator dirty");
        debug_assert_eq!(calc.current_depth(), entry_depth);
        trace!(positions = self.positions, %score, "tss solve finished");
        score
    }

    fn recurse(&mut self, calc: &mut PatternCalculator, depth: usize) -> Score {
        self.positions += 1;

        let mut actions = self.stack.acquire();
        let static_score = self.movegen.generate(calc, &mut actions, self.config.mode);
        if static_score.is_proven() {
            self.stack.release(actions);
            return static_score;
        }
        if actions.is_empty() || depth >= self.config.max_depth {
            let baseline = actions.baseline_score;
            self.stack.release(actions);
            return baseline;
        }

        let own = calc.sign_to_move();
        let remaining = (self.config.max_depth - depth - 1).min(u8::MAX as usize) as u8;
        let mut best = Score::MIN;
        let mut all_proven = true;
        let mut visited_all = true;

        for action in actions.as_slice() {
            // a proven child score from the generator needs no search
            if action.score.is_proven() {
                best = best.max(action.score);
                if best.is_win() {
                    break;
                }
                continue;
            }
            if self.positions >= self.config.max_positions {
                visited_all = false;
                break;
            }

            let mv = Move::new(own, action.loc);
            calc.add_move(mv);
            let child_hash = calc.hash();
            let child_score = match self.table.probe(child_hash, remaining) {
                Some(cached) => cached,
                None => {
                    let searched = self.recurse(calc, depth + 1);
                    self.table.store(child_hash, searched, remaining);
                    searched
                }
            };
            calc.undo_move(mv);

            let ours = -child_score.step();
            best = best.max(ours);
            if !ours.is_proven() {
                all_proven = false;
            }
            if best.is_win() {
                break;
            }
        }

        let result = if best.is_win() {
            best
        } else if all_proven && visited_all && actions.is_fully_expanded {
            // every relevant move is proven and none wins
            best
        } else {
            actions.baseline_score
        };
        self.stack.release(actions);
        result
    }
}

impl std::fmt::Debug for TssSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TssSolver")
            .field("config", &self.config)
            .field("positions", &self.positions)
            .finish()
    }
}
