//! The external-evaluator contract and the built-in fallback.
//!
//! The engine never runs a network itself; it ships batches of leaf
//! positions to an [`Evaluator`] and reads back a value distribution
//! plus a policy over board cells.

use renza_core::{Board, Sign};

use crate::mcts::Value;

/// One leaf position awaiting evaluation.
#[derive(Debug, Clone)]
pub struct EvalRequest {
    pub board: Board,
    pub to_move: Sign,
}

/// Evaluator reply for one request.
#[derive(Debug, Clone)]
pub struct EvalOutput {
    /// Outcome estimate for the side to move.
    pub value: Value,
    /// Unnormalised move preferences, row-major `rows * cols`.
    pub policy: Vec<f32>,
}

/// Batch position evaluator.
///
/// Implementations are consumed from the search thread; a neural
/// evaluator would forward the batch to its own device thread and
/// block until the results are ready.
pub trait Evaluator: Send {
    fn evaluate_batch(&mut self, batch: &[EvalRequest]) -> Vec<EvalOutput>;

    /// Largest batch worth assembling before evaluation.
    fn max_batch_size(&self) -> usize {
        16
    }
}

/// Neutral evaluator: uniform policy, balanced value.
///
/// Used in tests and as a fallback when no network is configured; the
/// tree then relies entirely on priors from move generation order and
/// the threat-space solver.
#[derive(Debug, Default, Clone)]
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn evaluate_batch(&mut self, batch: &[EvalRequest]) -> Vec<EvalOutput> {
        batch
            .iter()
            .map(|request| {
                let cells = request.board.rows() * request.board.cols();
                EvalOutput {
                    value: Value::new(0.4, 0.2, 0.4),
                    policy: vec![1.0 / cells as f32; cells],
                }
            })
            .collect()
    }
}
