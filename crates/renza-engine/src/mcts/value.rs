//! Win/draw/loss value estimates and proven game-theoretic outcomes.

use renza_core::Score;

/// Probability distribution over game outcomes from the perspective of
/// the side to move. Components sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    pub win: f32,
    pub draw: f32,
    pub loss: f32,
}

impl Value {
    pub const WIN: Value = Value { win: 1.0, draw: 0.0, loss: 0.0 };
    pub const DRAW: Value = Value { win: 0.0, draw: 1.0, loss: 0.0 };
    pub const LOSS: Value = Value { win: 0.0, draw: 0.0, loss: 1.0 };

    pub fn new(win: f32, draw: f32, loss: f32) -> Value {
        debug_assert!((win + draw + loss - 1.0).abs() < 1e-4, "value must sum to 1");
        Value { win, draw, loss }
    }

    /// Scalar expectation in `[0, 1]`: a draw counts half.
    #[inline]
    pub fn expectation(&self) -> f32 {
        self.win + 0.5 * self.draw
    }

    /// The same outcome seen by the other player.
    #[inline]
    pub fn inverted(&self) -> Value {
        Value { win: self.loss, draw: self.draw, loss: self.win }
    }
}

impl Default for Value {
    fn default() -> Value {
        Value { win: 0.0, draw: 1.0, loss: 0.0 }
    }
}

/// Deduced game-theoretic outcome tag, propagated through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvenValue {
    #[default]
    Unknown,
    Loss,
    Draw,
    Win,
}

impl ProvenValue {
    #[inline]
    pub fn is_proven(self) -> bool {
        self != ProvenValue::Unknown
    }

    /// The same proof seen by the other player.
    #[inline]
    pub fn inverted(self) -> ProvenValue {
        match self {
            ProvenValue::Win => ProvenValue::Loss,
            ProvenValue::Loss => ProvenValue::Win,
            other => other,
        }
    }

    /// Tag for a solver score, `Unknown` for heuristics.
    pub fn from_score(score: Score) -> ProvenValue {
        match score {
            Score::Win { .. } => ProvenValue::Win,
            Score::Loss { .. } => ProvenValue::Loss,
            Score::Draw { .. } => ProvenValue::Draw,
            Score::Eval(_) => ProvenValue::Unknown,
        }
    }

    /// Exact value distribution of a proven outcome.
    pub fn to_value(self) -> Option<Value> {
        match self {
            ProvenValue::Win => Some(Value::WIN),
            ProvenValue::Draw => Some(Value::DRAW),
            ProvenValue::Loss => Some(Value::LOSS),
            ProvenValue::Unknown => None,
        }
    }
}
