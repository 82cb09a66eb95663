//! Generator output: scored candidate moves plus position-level flags.

use renza_core::{Loc, Score};

/// One candidate move with its proven or heuristic score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub loc: Loc,
    pub score: Score,
}

/// Ordered list of candidate moves for one position.
#[derive(Debug, Default)]
pub struct ActionList {
    entries: Vec<Action>,
    /// Any move outside the list loses immediately.
    pub must_defend: bool,
    /// The side to move holds threats that keep the opponent reacting.
    pub has_initiative: bool,
    /// Whether the list covers every relevant move; loss proofs are
    /// only sound over fully expanded lists.
    pub is_fully_expanded: bool,
    /// Score assigned to the position if no child improves on it.
    pub baseline_score: Score,
}

impl ActionList {
    pub fn new() -> ActionList {
        ActionList {
            entries: Vec::new(),
            must_defend: false,
            has_initiative: false,
            is_fully_expanded: false,
            baseline_score: Score::UNKNOWN,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.must_defend = false;
        self.has_initiative = false;
        self.is_fully_expanded = false;
        self.baseline_score = Score::UNKNOWN;
    }

    #[inline]
    pub fn push(&mut self, loc: Loc, score: Score) {
        self.entries.push(Action { loc, score });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Action] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter()
    }

    pub fn contains(&self, loc: Loc) -> bool {
        self.entries.iter().any(|a| a.loc == loc)
    }

    pub fn score_of(&self, loc: Loc) -> Option<Score> {
        self.entries.iter().find(|a| a.loc == loc).map(|a| a.score)
    }

    /// Overwrite the score of an already-listed move.
    pub fn rescore(&mut self, loc: Loc, score: Score) {
        if let Some(action) = self.entries.iter_mut().find(|a| a.loc == loc) {
            action.score = score;
        }
    }

    /// Stable sort, best score first; keeps generation order among
    /// equal scores.
    pub fn sort_by_score(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

/// Arena of recycled action lists, one frame per recursion level.
///
/// The threat-space search acquires a list when it enters a node and
/// releases it on the way out; allocations only happen the first time
/// a depth is reached.
#[derive(Debug, Default)]
pub struct ActionStack {
    pool: Vec<ActionList>,
}

impl ActionStack {
    pub fn new() -> ActionStack {
        ActionStack { pool: Vec::new() }
    }

    /// Carve a cleared list for a child frame.
    pub fn acquire(&mut self) -> ActionList {
        match self.pool.pop() {
            Some(mut list) => {
                list.clear();
                list
            }
            None => ActionList::new(),
        }
    }

    /// Return a frame's list to the arena.
    pub fn release(&mut self, list: ActionList) {
        self.pool.push(list);
    }
}
