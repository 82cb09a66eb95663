//! Incremental pattern calculator: the padded board, its four line
//! projections, per-cell pattern types, and the threat histograms,
//! kept consistent under `add_move`/`undo_move`.

use std::collections::HashMap;

use crate::board::Board;
use crate::location::{Direction, Loc, LocList, Move};
use crate::pattern::{PatternTable, PatternType};
use crate::rules::GameRules;
use crate::sign::Sign;
use crate::threat::{aggregate_threat, ThreatHistogram, ThreatType};
use crate::zobrist;

/// Pattern types of one cell in all four directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionGroup(pub [PatternType; 4]);

impl DirectionGroup {
    #[inline]
    pub fn get(&self, dir: Direction) -> PatternType {
        self.0[dir.index()]
    }

    pub fn contains(&self, pattern: PatternType) -> bool {
        self.0.contains(&pattern)
    }

    pub fn count(&self, pattern: PatternType) -> usize {
        self.0.iter().filter(|&&p| p == pattern).count()
    }

    /// First direction holding `pattern`.
    pub fn find(&self, pattern: PatternType) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.get(*d) == pattern)
    }
}

/// Depth bound of the recursive renju 3x3-fork probe.
const MAX_PROBE_DEPTH: u32 = 5;
/// The forbidden-move memo is dropped when it grows past this.
const PROBE_MEMO_LIMIT: usize = 8192;

/// Rule-aware incremental board analysis.
///
/// Owns the padded board and every derived index. A worker thread owns
/// one calculator; `add_move` and `undo_move` are exact inverses, so a
/// search can explore and return to a byte-identical state.
pub struct PatternCalculator {
    rules: GameRules,
    table: &'static PatternTable,
    rows: usize,
    cols: usize,
    pad: usize,
    pcols: usize,
    window_len: usize,
    /// Padded `(rows+2P) x (cols+2P)` cells, walls carry `Illegal`.
    board: Vec<Sign>,
    /// Per padded cell x 4 directions: the 2-bit packed line window.
    windows: Vec<u32>,
    /// Per padded cell x 4 directions, per player.
    cross_patterns: Vec<PatternType>,
    circle_patterns: Vec<PatternType>,
    /// Per padded cell aggregated threats, per player.
    cross_threats: Vec<ThreatType>,
    circle_threats: Vec<ThreatType>,
    histograms: [ThreatHistogram; 2],
    sign_to_move: Sign,
    hash: u64,
    moves: Vec<Move>,
    root_stones: usize,
    forbidden_memo: HashMap<(u64, u8, u8), bool>,
}

impl PatternCalculator {
    pub fn new(rules: GameRules, rows: usize, cols: usize) -> PatternCalculator {
        let pad = rules.padding();
        let prows = rows + 2 * pad;
        let pcols = cols + 2 * pad;
        let cells = prows * pcols;
        let mut calc = PatternCalculator {
            rules,
            table: PatternTable::get(rules),
            rows,
            cols,
            pad,
            pcols,
            window_len: rules.window_len(),
            board: vec![Sign::Illegal; cells],
            windows: vec![0; cells * 4],
            cross_patterns: vec![PatternType::None; cells * 4],
            circle_patterns: vec![PatternType::None; cells * 4],
            cross_threats: vec![ThreatType::None; cells],
            circle_threats: vec![ThreatType::None; cells],
            histograms: [ThreatHistogram::new(), ThreatHistogram::new()],
            sign_to_move: Sign::Cross,
            hash: 0,
            moves: Vec::new(),
            root_stones: 0,
            forbidden_memo: HashMap::new(),
        };
        let empty = Board::empty(rows, cols).expect("calculator dimensions");
        calc.set_board(&empty, Sign::Cross);
        calc
    }

    #[inline]
    pub fn rules(&self) -> GameRules {
        self.rules
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
    pub fn padding(&self) -> usize {
        self.pad
    }

    /// Padded-array index of board coordinates (which may reach into
    /// the walls by up to `pad`).
    #[inline]
    fn cell_index(&self, row: i32, col: i32) -> usize {
        debug_assert!(row >= -(self.pad as i32) && col >= -(self.pad as i32));
        (row + self.pad as i32) as usize * self.pcols + (col + self.pad as i32) as usize
    }

    #[inline]
    pub fn in_board(&self, row: i32, col: i32) -> bool {
        (0..self.rows as i32).contains(&row) && (0..self.cols as i32).contains(&col)
    }

    #[inline]
    pub fn sign_at(&self, loc: Loc) -> Sign {
        self.board[self.cell_index(loc.row as i32, loc.col as i32)]
    }

    #[inline]
    pub fn sign_to_move(&self) -> Sign {
        self.sign_to_move
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Moves added since the last `set_board`.
    #[inline]
    pub fn current_depth(&self) -> usize {
        self.moves.len()
    }

    /// Stones currently on the board.
    #[inline]
    pub fn stone_count(&self) -> usize {
        self.root_stones + self.moves.len()
    }

    /// Raw 2-bit packed window centred on `loc` along `dir`.
    #[inline]
    pub fn window_at(&self, loc: Loc, dir: Direction) -> u32 {
        self.windows[self.cell_index(loc.row as i32, loc.col as i32) * 4 + dir.index()]
    }

    /// Pattern `sign` would create at `loc` in one direction.
    #[inline]
    pub fn pattern_at(&self, sign: Sign, loc: Loc, dir: Direction) -> PatternType {
        let index = self.cell_index(loc.row as i32, loc.col as i32) * 4 + dir.index();
        match sign {
            Sign::Cross => self.cross_patterns[index],
            Sign::Circle => self.circle_patterns[index],
            _ => PatternType::None,
        }
    }

    /// All four direction patterns of `sign` at `loc`.
    pub fn patterns_at(&self, sign: Sign, loc: Loc) -> DirectionGroup {
        DirectionGroup([
            self.pattern_at(sign, loc, Direction::Horizontal),
            self.pattern_at(sign, loc, Direction::Vertical),
            self.pattern_at(sign, loc, Direction::Diagonal),
            self.pattern_at(sign, loc, Direction::Antidiagonal),
        ])
    }

    /// Aggregated threat `sign` would create by playing `loc`.
    #[inline]
    pub fn threat_at(&self, sign: Sign, loc: Loc) -> ThreatType {
        let index = self.cell_index(loc.row as i32, loc.col as i32);
        match sign {
            Sign::Cross => self.cross_threats[index],
            Sign::Circle => self.circle_threats[index],
            _ => ThreatType::None,
        }
    }

    #[inline]
    pub fn histogram(&self, sign: Sign) -> &ThreatHistogram {
        &self.histograms[sign.player_index()]
    }

    #[inline]
    pub fn is_half_open_three_at(&self, loc: Loc, dir: Direction, sign: Sign) -> bool {
        self.pattern_at(sign, loc, dir) == PatternType::HalfOpenThree
    }

    /// Cells with which `defender` refutes the opposing threat at
    /// `loc` along `dir`. Includes the threat cell itself.
    pub fn defensive_moves(&self, defender: Sign, loc: Loc, dir: Direction) -> LocList<8> {
        let entry = self.table.entry(self.window_at(loc, dir));
        let mask = self.table.defensive_mask(entry, defender);
        let mut out = LocList::new();
        for j in 0..self.window_len {
            if mask & (1 << j) != 0 {
                let (r, c) = dir.shift(loc, j as i32 - self.pad as i32);
                if self.in_board(r, c) {
                    let cell = Loc::new(r as u8, c as u8);
                    if self.sign_at(cell) == Sign::None {
                        out.push(cell);
                    }
                }
            }
        }
        out
    }

    /// Bitmask of empty cells in `row`, bit `col` set when playable.
    pub fn empty_mask_row(&self, row: usize) -> u32 {
        let mut mask = 0u32;
        for col in 0..self.cols {
            if self.board[self.cell_index(row as i32, col as i32)] == Sign::None {
                mask |= 1 << col;
            }
        }
        mask
    }

    /// Replace the position. Every derived index is rebuilt.
    pub fn set_board(&mut self, board: &Board, sign_to_move: Sign) {
        assert_eq!(board.rows(), self.rows, "board shape mismatch");
        assert_eq!(board.cols(), self.cols, "board shape mismatch");
        debug_assert!(sign_to_move.is_stone());

        self.board.fill(Sign::Illegal);
        for loc in board.locations() {
            let index = self.cell_index(loc.row as i32, loc.col as i32);
            self.board[index] = board.at(loc);
        }
        self.sign_to_move = sign_to_move;
        self.hash = board.hash();
        self.moves.clear();
        self.root_stones = board.stone_count();
        self.forbidden_memo.clear();

        self.windows.fill(0);
        for row in 0..self.rows as i32 {
            for col in 0..self.cols as i32 {
                for dir in Direction::ALL {
                    let mut bits = 0u32;
                    for j in 0..self.window_len {
                        let (r, c) = dir.shift(Loc::new(row as u8, col as u8), j as i32 - self.pad as i32);
                        let sign = if r >= -(self.pad as i32)
                            && c >= -(self.pad as i32)
                            && r < (self.rows + self.pad) as i32
                            && c < (self.cols + self.pad) as i32
                        {
                            self.board[self.cell_index(r, c)]
                        } else {
                            Sign::Illegal
                        };
                        bits |= sign.bits() << (2 * j);
                    }
                    let index = self.cell_index(row, col) * 4 + dir.index();
                    self.windows[index] = bits;
                }
            }
        }

        self.cross_patterns.fill(PatternType::None);
        self.circle_patterns.fill(PatternType::None);
        self.cross_threats.fill(ThreatType::None);
        self.circle_threats.fill(ThreatType::None);
        self.histograms[0].clear();
        self.histograms[1].clear();
        for row in 0..self.rows {
            for col in 0..self.cols {
                for dir in Direction::ALL {
                    self.refresh_cell(row as i32, col as i32, dir);
                }
            }
        }
    }

    /// Play a move for the side to move.
    pub fn add_move(&mut self, mv: Move) {
        assert_eq!(mv.sign, self.sign_to_move, "move out of turn");
        self.raw_add(mv);
        self.moves.push(mv);
        self.sign_to_move = mv.sign.invert();
    }

    /// Retract the most recent move.
    pub fn undo_move(&mut self, mv: Move) {
        let last = self.moves.pop().expect("undo with no moves on the stack");
        assert_eq!(last, mv, "undo out of order");
        self.raw_undo(mv);
        self.sign_to_move = mv.sign;
    }

    fn raw_add(&mut self, mv: Move) {
        let index = self.cell_index(mv.loc.row as i32, mv.loc.col as i32);
        debug_assert_eq!(self.board[index], Sign::None, "add on occupied cell");
        self.board[index] = mv.sign;
        self.hash ^= zobrist::key(mv.loc, mv.sign);

        let pad = self.pad as i32;
        for dir in Direction::ALL {
            for i in 0..self.window_len as i32 {
                let (r, c) = dir.shift(mv.loc, i - pad);
                let j = 2 * pad - i;
                let windex = self.cell_index(r, c) * 4 + dir.index();
                self.windows[windex] |= mv.sign.bits() << (2 * j);
            }
        }
        self.refresh_neighbourhood(mv.loc);
    }

    fn raw_undo(&mut self, mv: Move) {
        let index = self.cell_index(mv.loc.row as i32, mv.loc.col as i32);
        debug_assert_eq!(self.board[index], mv.sign, "undo of a different stone");
        self.board[index] = Sign::None;
        self.hash ^= zobrist::key(mv.loc, mv.sign);

        let pad = self.pad as i32;
        for dir in Direction::ALL {
            for i in 0..self.window_len as i32 {
                let (r, c) = dir.shift(mv.loc, i - pad);
                let j = 2 * pad - i;
                let windex = self.cell_index(r, c) * 4 + dir.index();
                self.windows[windex] &= !(3 << (2 * j));
            }
        }
        self.refresh_neighbourhood(mv.loc);
    }

    /// Re-derive patterns, threats, and histogram entries for every
    /// cell whose window contains `loc`.
    fn refresh_neighbourhood(&mut self, loc: Loc) {
        let pad = self.pad as i32;
        for dir in Direction::ALL {
            for i in 0..self.window_len as i32 {
                let (r, c) = dir.shift(loc, i - pad);
                if self.in_board(r, c) {
                    self.refresh_cell(r, c, dir);
                }
            }
        }
    }

    fn refresh_cell(&mut self, row: i32, col: i32, dir: Direction) {
        let cell = self.cell_index(row, col);
        let windex = cell * 4 + dir.index();
        let entry = self.table.entry(self.windows[windex]);
        self.cross_patterns[windex] = entry.pattern(Sign::Cross);
        self.circle_patterns[windex] = entry.pattern(Sign::Circle);

        let loc = Loc::new(row as u8, col as u8);
        let old_cross = self.cross_threats[cell];
        let old_circle = self.circle_threats[cell];
        let (new_cross, new_circle) = if self.board[cell] == Sign::None {
            let base = cell * 4;
            let cross = aggregate_threat([
                self.cross_patterns[base],
                self.cross_patterns[base + 1],
                self.cross_patterns[base + 2],
                self.cross_patterns[base + 3],
            ]);
            let circle = aggregate_threat([
                self.circle_patterns[base],
                self.circle_patterns[base + 1],
                self.circle_patterns[base + 2],
                self.circle_patterns[base + 3],
            ]);
            (cross, circle)
        } else {
            (ThreatType::None, ThreatType::None)
        };
        self.cross_threats[cell] = new_cross;
        self.circle_threats[cell] = new_circle;
        self.histograms[0].update(old_cross, new_cross, loc);
        self.histograms[1].update(old_circle, new_circle, loc);
    }

    // ── Forbidden moves (renju, cross) ──────────────────────────────────────

    /// Whether playing `loc` is forbidden for `sign` under the current
    /// rules. Only renju cross can be forbidden.
    pub fn is_forbidden(&mut self, sign: Sign, loc: Loc) -> bool {
        if !self.rules.forbidden_for(sign) || self.sign_at(loc) != Sign::None {
            return false;
        }
        match self.threat_at(sign, loc) {
            ThreatType::Overline | ThreatType::Fork4x4 => true,
            // the aggregate ranks an open four above forks, but an
            // open four paired with any second four is still a double
            // four under renju
            ThreatType::OpenFour => {
                let group = self.patterns_at(sign, loc);
                let fours: usize = Direction::ALL
                    .iter()
                    .map(|&d| match group.get(d) {
                        PatternType::DoubleFour => 2,
                        PatternType::OpenFour | PatternType::HalfOpenFour => 1,
                        _ => 0,
                    })
                    .sum();
                fours >= 2
            }
            ThreatType::Fork3x3 => self.fork_3x3_forbidden(loc, 0),
            _ => false,
        }
    }

    /// A cross 3x3 fork is forbidden iff at least two of its threes
    /// can be legally extended to a straight four; an extension is
    /// legal iff its own cell is not forbidden. Resolved by a bounded
    /// add/undo probe with a small memo.
    fn fork_3x3_forbidden(&mut self, loc: Loc, depth: u32) -> bool {
        let key = (self.hash, loc.row, loc.col);
        if let Some(&cached) = self.forbidden_memo.get(&key) {
            return cached;
        }
        if depth >= MAX_PROBE_DEPTH {
            // too deep to resolve; treat as playable
            return false;
        }

        let mv = Move::new(Sign::Cross, loc);
        self.raw_add(mv);
        let pad = self.pad as i32;
        let mut usable_threes = 0;
        for dir in Direction::ALL {
            let mut usable = false;
            for i in -pad..=pad {
                if i == 0 {
                    continue;
                }
                let (r, c) = dir.shift(loc, i);
                if !self.in_board(r, c) {
                    continue;
                }
                let cell = Loc::new(r as u8, c as u8);
                if self.sign_at(cell) != Sign::None
                    || self.pattern_at(Sign::Cross, cell, dir) != PatternType::OpenFour
                {
                    continue;
                }
                let extension_forbidden = match self.threat_at(Sign::Cross, cell) {
                    ThreatType::Overline | ThreatType::Fork4x4 => true,
                    ThreatType::Fork3x3 => self.fork_3x3_forbidden(cell, depth + 1),
                    _ => false,
                };
                if !extension_forbidden {
                    usable = true;
                    break;
                }
            }
            if usable {
                usable_threes += 1;
                if usable_threes >= 2 {
                    break;
                }
            }
        }
        self.raw_undo(mv);

        let forbidden = usable_threes >= 2;
        if self.forbidden_memo.len() >= PROBE_MEMO_LIMIT {
            self.forbidden_memo.clear();
        }
        self.forbidden_memo.insert(key, forbidden);
        forbidden
    }
}

impl std::fmt::Debug for PatternCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCalculator")
            .field("rules", &self.rules)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("depth", &self.current_depth())
            .field("hash", &format_args!("{:#018x}", self.hash))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_from(rules: GameRules, rows: &[&str], to_move: Sign) -> PatternCalculator {
        let board = Board::from_rows(rows).unwrap();
        let mut calc = PatternCalculator::new(rules, board.rows(), board.cols());
        calc.set_board(&board, to_move);
        calc
    }

    #[test]
    fn five_threat_in_a_column() {
        let calc = calc_from(
            GameRules::Freestyle,
            &["X _ _ _ _", "X _ _ _ _", "X _ _ _ _", "X _ _ _ _", "_ _ _ _ _"],
            Sign::Cross,
        );
        assert_eq!(calc.threat_at(Sign::Cross, Loc::new(4, 0)), ThreatType::Five);
        assert_eq!(calc.histogram(Sign::Cross).get(ThreatType::Five), &[Loc::new(4, 0)]);
        assert!(calc.histogram(Sign::Circle).get(ThreatType::Five).is_empty());
    }

    #[test]
    fn open_three_gives_open_four_threats() {
        let calc = calc_from(
            GameRules::Freestyle,
            &[
                "_ _ _ _ _ _ _ _ _",
                "_ O O O _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        // extending at either side of _OOO_ makes an open four
        assert_eq!(calc.threat_at(Sign::Circle, Loc::new(1, 0)), ThreatType::HalfOpenFour);
        assert_eq!(calc.threat_at(Sign::Circle, Loc::new(1, 4)), ThreatType::OpenFour);
        assert_eq!(calc.threat_at(Sign::Circle, Loc::new(1, 5)), ThreatType::HalfOpenFour);
    }

    #[test]
    fn add_undo_restores_state() {
        let mut calc = calc_from(
            GameRules::Standard,
            &[
                "_ _ _ _ _ _ _ _ _",
                "_ X O _ _ _ _ _ _",
                "_ _ X _ _ _ _ _ _",
                "_ _ _ O _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        let hash0 = calc.hash();
        let windows0 = calc.windows.clone();
        let cross0 = calc.cross_threats.clone();
        let circle0 = calc.circle_threats.clone();

        let moves = [
            Move::new(Sign::Cross, Loc::new(4, 4)),
            Move::new(Sign::Circle, Loc::new(5, 5)),
            Move::new(Sign::Cross, Loc::new(3, 5)),
            Move::new(Sign::Circle, Loc::new(0, 0)),
        ];
        for mv in moves {
            calc.add_move(mv);
        }
        assert_eq!(calc.current_depth(), 4);
        assert_ne!(calc.hash(), hash0);

        for mv in moves.iter().rev() {
            calc.undo_move(*mv);
        }
        assert_eq!(calc.current_depth(), 0);
        assert_eq!(calc.hash(), hash0);
        assert_eq!(calc.windows, windows0);
        assert_eq!(calc.cross_threats, cross0);
        assert_eq!(calc.circle_threats, circle0);
        assert_eq!(calc.sign_to_move(), Sign::Cross);
    }

    #[test]
    fn histogram_tracks_per_cell_threats() {
        let mut calc = calc_from(
            GameRules::Freestyle,
            &[
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        calc.add_move(Move::new(Sign::Cross, Loc::new(4, 2)));
        calc.add_move(Move::new(Sign::Circle, Loc::new(0, 0)));
        calc.add_move(Move::new(Sign::Cross, Loc::new(4, 3)));
        calc.add_move(Move::new(Sign::Circle, Loc::new(0, 1)));
        calc.add_move(Move::new(Sign::Cross, Loc::new(4, 4)));

        // every histogram entry matches the per-cell threat, and vice versa
        for sign in Sign::PLAYERS {
            for row in 0..9u8 {
                for col in 0..9u8 {
                    let loc = Loc::new(row, col);
                    let threat = calc.threat_at(sign, loc);
                    if threat != ThreatType::None {
                        assert!(
                            calc.histogram(sign).get(threat).contains(&loc),
                            "{sign} {loc} {threat} missing from histogram"
                        );
                    }
                }
            }
            for t in [
                ThreatType::OpenThree,
                ThreatType::OpenFour,
                ThreatType::HalfOpenFour,
                ThreatType::Five,
            ] {
                for &loc in calc.histogram(sign).get(t) {
                    assert_eq!(calc.threat_at(sign, loc), t);
                }
            }
        }
    }

    #[test]
    fn defensive_moves_against_open_four_threat() {
        let calc = calc_from(
            GameRules::Freestyle,
            &[
                "_ O O O _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        // circle's open-four threat at (0,4): cross defends at the two
        // ends and the threat cell
        let defenses = calc.defensive_moves(Sign::Cross, Loc::new(0, 4), Direction::Horizontal);
        let mut got: Vec<Loc> = defenses.iter().collect();
        got.sort();
        assert_eq!(got, vec![Loc::new(0, 0), Loc::new(0, 4), Loc::new(0, 5)]);
    }

    #[test]
    fn caro_defensive_moves_extend_to_boundaries() {
        let calc = calc_from(
            GameRules::Caro5,
            &[
                "_ O O O _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        let defenses = calc.defensive_moves(Sign::Cross, Loc::new(0, 4), Direction::Horizontal);
        let mut got: Vec<Loc> = defenses.iter().collect();
        got.sort();
        assert_eq!(
            got,
            vec![Loc::new(0, 0), Loc::new(0, 4), Loc::new(0, 5), Loc::new(0, 6)]
        );
    }

    #[test]
    fn renju_overline_is_forbidden_for_cross() {
        let mut calc = calc_from(
            GameRules::Renju,
            &[
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ X X X _ X X _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        // playing (1,4) makes X X X X X X -- an overline
        assert_eq!(calc.threat_at(Sign::Cross, Loc::new(1, 4)), ThreatType::Overline);
        assert!(calc.is_forbidden(Sign::Cross, Loc::new(1, 4)));
    }

    #[test]
    fn renju_double_three_fork_is_forbidden() {
        let mut calc = calc_from(
            GameRules::Renju,
            &[
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ ! X X _ _ _ _ _",
                "_ _ _ _ _ _ _ X _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ X _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        // (6,7) completes an open three along the row and another down
        // the column, and both extend to legal straight fours
        let loc = Loc::new(6, 7);
        assert_eq!(calc.threat_at(Sign::Cross, loc), ThreatType::Fork3x3);
        assert!(calc.is_forbidden(Sign::Cross, loc));
        // the same shape is legal for circle
        assert!(!calc.is_forbidden(Sign::Circle, loc));
    }

    #[test]
    fn renju_open_four_doubled_with_second_four_is_forbidden() {
        let mut calc = calc_from(
            GameRules::Renju,
            &[
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ X _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ X _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ X _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ ! X X X _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        // (7,4) completes an open four in the column and a four along
        // the row at once: a double four despite the open-four rank
        assert_eq!(calc.threat_at(Sign::Cross, Loc::new(7, 4)), ThreatType::OpenFour);
        assert!(calc.is_forbidden(Sign::Cross, Loc::new(7, 4)));
    }

    #[test]
    fn standard_never_forbidden() {
        let mut calc = calc_from(
            GameRules::Standard,
            &[
                "_ _ _ _ _ _ _ _ _",
                "_ X X X _ X X _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
                "_ _ _ _ _ _ _ _ _",
            ],
            Sign::Cross,
        );
        assert!(!calc.is_forbidden(Sign::Cross, Loc::new(1, 4)));
    }

    #[test]
    fn set_board_resets_depth_and_turn() {
        let mut calc = PatternCalculator::new(GameRules::Freestyle, 9, 9);
        calc.add_move(Move::new(Sign::Cross, Loc::new(4, 4)));
        assert_eq!(calc.current_depth(), 1);
        let board = Board::square(9).unwrap();
        calc.set_board(&board, Sign::Circle);
        assert_eq!(calc.current_depth(), 0);
        assert_eq!(calc.sign_to_move(), Sign::Circle);
        assert_eq!(calc.stone_count(), 0);
    }
}
