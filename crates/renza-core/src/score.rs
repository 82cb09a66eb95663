//! Tagged search scores: proven outcomes with ply distance, or a
//! heuristic evaluation.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

/// Half of the ordinal range; evaluations must stay well inside it.
const WIN_BASE: i32 = 16_000;

/// Largest magnitude a heuristic evaluation can carry (14-bit packing).
pub const EVAL_LIMIT: i16 = 8_191;

/// Outcome of analysing a position, from the perspective of the side
/// to move.
///
/// Ordering: any loss < any draw < any heuristic < any win; among
/// losses a larger ply distance is better, among wins a smaller one.
/// Heuristic scores compare by value and sit around zero, between the
/// proven bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    /// Proven loss in `ply` plies.
    Loss { ply: u8 },
    /// Proven draw reached in `ply` plies.
    Draw { ply: u8 },
    /// Unproven heuristic value (move-ordering prior).
    Eval(i16),
    /// Proven win in `ply` plies.
    Win { ply: u8 },
}

impl Score {
    /// Worst possible score: an immediate loss.
    pub const MIN: Score = Score::Loss { ply: 0 };
    /// Best possible score: an immediate win.
    pub const MAX: Score = Score::Win { ply: 0 };
    /// Neutral unproven score.
    pub const UNKNOWN: Score = Score::Eval(0);

    #[inline]
    pub const fn win_in(ply: u8) -> Score {
        Score::Win { ply }
    }

    #[inline]
    pub const fn loss_in(ply: u8) -> Score {
        Score::Loss { ply }
    }

    #[inline]
    pub const fn draw_in(ply: u8) -> Score {
        Score::Draw { ply }
    }

    /// Heuristic score, clamped to the packable range.
    #[inline]
    pub fn eval(value: i16) -> Score {
        Score::Eval(value.clamp(-EVAL_LIMIT, EVAL_LIMIT))
    }

    #[inline]
    pub const fn is_win(self) -> bool {
        matches!(self, Score::Win { .. })
    }

    #[inline]
    pub const fn is_loss(self) -> bool {
        matches!(self, Score::Loss { .. })
    }

    #[inline]
    pub const fn is_draw(self) -> bool {
        matches!(self, Score::Draw { .. })
    }

    /// Whether the score is a game-theoretic proof rather than a prior.
    #[inline]
    pub const fn is_proven(self) -> bool {
        !matches!(self, Score::Eval(_))
    }

    /// Ply distance of a proven score.
    #[inline]
    pub const fn ply(self) -> Option<u8> {
        match self {
            Score::Loss { ply } | Score::Draw { ply } | Score::Win { ply } => Some(ply),
            Score::Eval(_) => None,
        }
    }

    /// Move one ply further from the root; used when backing a child
    /// score up to its parent.
    #[inline]
    pub const fn step(self) -> Score {
        match self {
            Score::Loss { ply } => Score::Loss { ply: ply.saturating_add(1) },
            Score::Draw { ply } => Score::Draw { ply: ply.saturating_add(1) },
            Score::Win { ply } => Score::Win { ply: ply.saturating_add(1) },
            eval => eval,
        }
    }

    /// Scalar used for comparisons; proven bands bracket the
    /// heuristic range.
    #[inline]
    const fn ordinal(self) -> i32 {
        match self {
            Score::Loss { ply } => -WIN_BASE + ply as i32,
            Score::Draw { .. } => 0,
            Score::Eval(v) => v as i32,
            Score::Win { ply } => WIN_BASE - ply as i32,
        }
    }

    const fn variant_rank(self) -> u8 {
        match self {
            Score::Loss { .. } => 0,
            Score::Draw { .. } => 1,
            Score::Eval(_) => 2,
            Score::Win { .. } => 3,
        }
    }

    /// Pack into 16 bits for transposition-table storage.
    pub const fn to_bits(self) -> u16 {
        match self {
            Score::Loss { ply } => ply as u16,
            Score::Draw { ply } => (1 << 14) | ply as u16,
            Score::Eval(v) => (2 << 14) | ((v as u16) & 0x3FFF),
            Score::Win { ply } => (3 << 14) | ply as u16,
        }
    }

    /// Inverse of [`to_bits`](Score::to_bits).
    pub const fn from_bits(bits: u16) -> Score {
        let payload = bits & 0x3FFF;
        match bits >> 14 {
            0 => Score::Loss { ply: payload as u8 },
            1 => Score::Draw { ply: payload as u8 },
            2 => {
                // sign-extend the 14-bit payload
                let v = ((payload << 2) as i16) >> 2;
                Score::Eval(v)
            }
            _ => Score::Win { ply: payload as u8 },
        }
    }
}

impl Neg for Score {
    type Output = Score;

    /// Flip perspective: a win for one side is a loss for the other at
    /// the same distance.
    fn neg(self) -> Score {
        match self {
            Score::Loss { ply } => Score::Win { ply },
            Score::Win { ply } => Score::Loss { ply },
            Score::Draw { ply } => Score::Draw { ply },
            Score::Eval(v) => Score::Eval(-v),
        }
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Score) -> Ordering {
        self.ordinal()
            .cmp(&other.ordinal())
            .then_with(|| self.variant_rank().cmp(&other.variant_rank()))
            .then_with(|| match (self, other) {
                // among equal-ordinal draws, a later draw ranks higher
                (Score::Draw { ply: a }, Score::Draw { ply: b }) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Score) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Score {
    fn default() -> Score {
        Score::UNKNOWN
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Loss { ply } => write!(f, "loss({ply})"),
            Score::Draw { ply } => write!(f, "draw({ply})"),
            Score::Eval(v) => write!(f, "{v:+}"),
            Score::Win { ply } => write!(f, "win({ply})"),
        }
    }
}
