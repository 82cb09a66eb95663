//! Aggregated per-cell threats and the per-sign threat histograms.

use std::fmt;

use crate::location::Loc;
use crate::pattern::PatternType;

/// The strongest threat a move would create, aggregated over the four
/// directions. Forks combine threats from distinct directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ThreatType {
    None = 0,
    HalfOpenThree = 1,
    OpenThree = 2,
    Fork3x3 = 3,
    HalfOpenFour = 4,
    Fork4x3 = 5,
    Fork4x4 = 6,
    OpenFour = 7,
    Five = 8,
    Overline = 9,
}

impl ThreatType {
    pub const COUNT: usize = 10;

    /// All threat levels that put a five within one move.
    #[inline]
    pub const fn is_four_or_better(self) -> bool {
        (self as u8) >= (ThreatType::HalfOpenFour as u8)
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreatType::None => "none",
            ThreatType::HalfOpenThree => "half-open-3",
            ThreatType::OpenThree => "open-3",
            ThreatType::Fork3x3 => "fork-3x3",
            ThreatType::HalfOpenFour => "half-open-4",
            ThreatType::Fork4x3 => "fork-4x3",
            ThreatType::Fork4x4 => "fork-4x4",
            ThreatType::OpenFour => "open-4",
            ThreatType::Five => "five",
            ThreatType::Overline => "overline",
        };
        f.write_str(name)
    }
}

/// Combine the four per-direction patterns of a cell into its threat.
///
/// A double four in a single direction already carries two five
/// threats, so it counts as a 4x4 fork on its own.
pub fn aggregate_threat(group: [PatternType; 4]) -> ThreatType {
    let mut fours = 0u32;
    let mut threes = 0u32;
    let mut half_threes = 0u32;
    for pattern in group {
        match pattern {
            PatternType::Overline => return ThreatType::Overline,
            PatternType::Five => return ThreatType::Five,
            PatternType::OpenFour => return ThreatType::OpenFour,
            PatternType::DoubleFour => fours += 2,
            PatternType::HalfOpenFour => fours += 1,
            PatternType::OpenThree => threes += 1,
            PatternType::HalfOpenThree => half_threes += 1,
            PatternType::None => {}
        }
    }
    match (fours, threes) {
        (f, _) if f >= 2 => ThreatType::Fork4x4,
        (1, t) if t >= 1 => ThreatType::Fork4x3,
        (1, _) => ThreatType::HalfOpenFour,
        (0, t) if t >= 2 => ThreatType::Fork3x3,
        (0, 1) => ThreatType::OpenThree,
        _ if half_threes > 0 => ThreatType::HalfOpenThree,
        _ => ThreatType::None,
    }
}

/// Per-sign mapping from threat level to the cells that would create
/// it. Kept in lock-step with the calculator's per-cell threats.
pub struct ThreatHistogram {
    buckets: [Vec<Loc>; ThreatType::COUNT],
}

impl ThreatHistogram {
    pub fn new() -> ThreatHistogram {
        ThreatHistogram { buckets: Default::default() }
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Cells that would create `threat` if played by this histogram's
    /// sign.
    #[inline]
    pub fn get(&self, threat: ThreatType) -> &[Loc] {
        &self.buckets[threat as usize]
    }

    /// Whether any four-level threat is available. Fives are excluded;
    /// the callers asking this question have already resolved them.
    pub fn has_any_four(&self) -> bool {
        self.buckets[ThreatType::HalfOpenFour as usize..=ThreatType::OpenFour as usize]
            .iter()
            .any(|bucket| !bucket.is_empty())
    }

    /// Move a cell between buckets after its aggregate threat changed.
    ///
    /// Half-open threes and fours churn constantly, so their buckets
    /// use swap-removal; rarer threats keep insertion order, which the
    /// generator prefers for move ordering.
    pub fn update(&mut self, old: ThreatType, new: ThreatType, loc: Loc) {
        if old == new {
            return;
        }
        if old != ThreatType::None {
            let bucket = &mut self.buckets[old as usize];
            let index = bucket
                .iter()
                .position(|&x| x == loc)
                .expect("histogram out of sync: removing untracked threat");
            if matches!(old, ThreatType::HalfOpenThree | ThreatType::HalfOpenFour) {
                bucket.swap_remove(index);
            } else {
                bucket.remove(index);
            }
        }
        if new != ThreatType::None {
            self.buckets[new as usize].push(loc);
        }
    }

    /// Total tracked cells, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.buckets[1..].iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ThreatHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_single_patterns() {
        use PatternType::*;
        let quiet = [None, None, None, None];
        assert_eq!(aggregate_threat(quiet), ThreatType::None);
        assert_eq!(aggregate_threat([Five, None, None, None]), ThreatType::Five);
        assert_eq!(aggregate_threat([OpenFour, HalfOpenFour, None, None]), ThreatType::OpenFour);
        assert_eq!(aggregate_threat([HalfOpenFour, None, None, None]), ThreatType::HalfOpenFour);
        assert_eq!(aggregate_threat([OpenThree, None, None, None]), ThreatType::OpenThree);
        assert_eq!(aggregate_threat([HalfOpenThree, None, None, HalfOpenThree]), ThreatType::HalfOpenThree);
    }

    #[test]
    fn aggregate_forks() {
        use PatternType::*;
        assert_eq!(
            aggregate_threat([HalfOpenFour, HalfOpenFour, None, None]),
            ThreatType::Fork4x4
        );
        assert_eq!(aggregate_threat([DoubleFour, None, None, None]), ThreatType::Fork4x4);
        assert_eq!(
            aggregate_threat([HalfOpenFour, OpenThree, None, None]),
            ThreatType::Fork4x3
        );
        assert_eq!(aggregate_threat([OpenThree, None, OpenThree, None]), ThreatType::Fork3x3);
        assert_eq!(aggregate_threat([Overline, HalfOpenFour, None, None]), ThreatType::Overline);
    }

    #[test]
    fn histogram_update_moves_between_buckets() {
        let mut hist = ThreatHistogram::new();
        let loc = Loc::new(3, 3);
        hist.update(ThreatType::None, ThreatType::OpenThree, loc);
        assert_eq!(hist.get(ThreatType::OpenThree), &[loc]);

        hist.update(ThreatType::OpenThree, ThreatType::OpenFour, loc);
        assert!(hist.get(ThreatType::OpenThree).is_empty());
        assert_eq!(hist.get(ThreatType::OpenFour), &[loc]);

        hist.update(ThreatType::OpenFour, ThreatType::None, loc);
        assert!(hist.is_empty());
    }

    #[test]
    fn has_any_four() {
        let mut hist = ThreatHistogram::new();
        assert!(!hist.has_any_four());
        hist.update(ThreatType::None, ThreatType::OpenThree, Loc::new(0, 0));
        assert!(!hist.has_any_four());
        hist.update(ThreatType::None, ThreatType::Fork4x3, Loc::new(1, 1));
        assert!(hist.has_any_four());
    }

    #[test]
    fn no_op_update_keeps_state() {
        let mut hist = ThreatHistogram::new();
        let loc = Loc::new(2, 2);
        hist.update(ThreatType::None, ThreatType::Five, loc);
        hist.update(ThreatType::Five, ThreatType::Five, loc);
        assert_eq!(hist.get(ThreatType::Five), &[loc]);
    }
}
