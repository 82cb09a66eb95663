//! Threat-aware move generation.
//!
//! The generator walks a fixed ladder of tactical stages, from "win on
//! the spot" down to "defend a distant fork", and stops at the first
//! stage that resolves the position. Later stages only widen the list
//! with heuristic moves, so a caller can rely on two contracts: a
//! proven return score makes every differently-scored move irrelevant,
//! and a `must_defend` list is complete (anything outside it loses).

use renza_core::{
    Direction, GameRules, Loc, LocList, PatternCalculator, PatternType, Score, Sign, ThreatType,
};

use crate::action::ActionList;

/// How wide a list the caller wants.
///
/// Every mode runs the tactical ladder; the variants differ in how the
/// remaining quiet moves are filled in afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GeneratorMode {
    /// Tactical moves only; no quiet fill.
    Threats,
    /// Tactical moves, small ordering priors, quiet moves near stones.
    Optimal,
    /// Tactical moves plus quiet moves near stones.
    Reduced,
    /// Tactical moves plus every legal move.
    Legal,
}

/// 7x7 stamp marking the quiet-move neighbourhood of a stone.
const NEIGHBOURHOOD: [u32; 7] = [
    0b1001001, 0b0111110, 0b0111110, 0b1110111, 0b0111110, 0b0111110, 0b1001001,
];

/// 7x7 stamp marking star-shaped line extensions of a stone.
const STAR: [u32; 7] = [
    0b1001001, 0b0101010, 0b0011100, 0b1110111, 0b0011100, 0b0101010, 0b1001001,
];

/// Ordering priors for quiet threat moves (Optimal mode and fork
/// defense), matching the tactical ladder's relative urgencies.
const PRIOR_OWN_OPEN_THREE: i16 = 1;
const PRIOR_OPP_OPEN_THREE: i16 = 2;
const PRIOR_OPP_FORK_3X3: i16 = 3;
const PRIOR_OPP_HALF_OPEN_FOUR: i16 = 4;
const PRIOR_OWN_FORK_3X3: i16 = 13;
const PRIOR_OWN_HALF_OPEN_FOUR: i16 = 14;

enum Flow {
    Continue,
    Stop(Score),
}

/// Reusable move generator for one board shape.
pub struct MoveGenerator {
    rows: usize,
    cols: usize,
    marked: Vec<bool>,
}

impl MoveGenerator {
    pub fn new(rows: usize, cols: usize) -> MoveGenerator {
        MoveGenerator { rows, cols, marked: vec![false; rows * cols] }
    }

    /// Fill `actions` for the side to move and return the position
    /// score proven so far (`Score::UNKNOWN` when undecided).
    pub fn generate(
        &mut self,
        calc: &mut PatternCalculator,
        actions: &mut ActionList,
        mode: GeneratorMode,
    ) -> Score {
        debug_assert_eq!(calc.rows(), self.rows);
        debug_assert_eq!(calc.cols(), self.cols);
        actions.clear();
        self.marked.fill(false);

        let mut r#gen = Gen {
            rows: self.rows,
            cols: self.cols,
            own: calc.sign_to_move(),
            opp: calc.sign_to_move().invert(),
            rules: calc.rules(),
            calc,
            actions,
            marked: &mut self.marked,
        };
        let distance_to_draw = r#gen.rows * r#gen.cols - r#gen.calc.stone_count();

        let mut flow = r#gen.try_win_in_1();
        if matches!(flow, Flow::Continue) && distance_to_draw <= 1 {
            flow = r#gen.try_draw_in_1();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 2 {
            flow = r#gen.defend_loss_in_2();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 3 {
            flow = r#gen.try_win_in_3();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 4 {
            flow = r#gen.defend_loss_in_4();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 5 {
            flow = r#gen.try_win_in_5();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 6 {
            flow = r#gen.defend_loss_in_6();
        }
        if matches!(flow, Flow::Continue) && distance_to_draw >= 3 {
            let count = r#gen.add_own_half_open_fours();
            if count > 0 {
                r#gen.actions.has_initiative = true;
            }
        }
        if matches!(flow, Flow::Continue) && mode >= GeneratorMode::Optimal {
            if mode == GeneratorMode::Optimal {
                if distance_to_draw >= 6 {
                    r#gen.add_bucket(r#gen.opp, ThreatType::Fork3x3, Score::eval(PRIOR_OPP_FORK_3X3));
                    r#gen.add_bucket(r#gen.opp, ThreatType::OpenThree, Score::eval(PRIOR_OPP_OPEN_THREE));
                }
                if distance_to_draw >= 5 {
                    r#gen.add_bucket(r#gen.own, ThreatType::Fork3x3, Score::eval(PRIOR_OWN_FORK_3X3));
                    r#gen.add_bucket(r#gen.own, ThreatType::OpenThree, Score::eval(PRIOR_OWN_OPEN_THREE));
                }
                if distance_to_draw >= 3 {
                    r#gen.add_bucket(r#gen.opp, ThreatType::HalfOpenFour, Score::eval(PRIOR_OPP_HALF_OPEN_FOUR));
                }
            }
            r#gen.fill_remaining(mode);
        }
        if r#gen.rules.forbidden_for(r#gen.own) {
            r#gen.mark_forbidden_moves();
        }

        r#gen.actions.is_fully_expanded = r#gen.actions.must_defend || mode >= GeneratorMode::Optimal;
        match flow {
            Flow::Stop(score) => score,
            Flow::Continue => Score::UNKNOWN,
        }
    }
}

struct Gen<'a> {
    rows: usize,
    cols: usize,
    own: Sign,
    opp: Sign,
    rules: GameRules,
    calc: &'a mut PatternCalculator,
    actions: &'a mut ActionList,
    marked: &'a mut Vec<bool>,
}

impl Gen<'_> {
    #[inline]
    fn mark_index(&self, loc: Loc) -> usize {
        loc.row as usize * self.cols + loc.col as usize
    }

    /// Add a move unless already listed.
    fn add(&mut self, loc: Loc, score: Score) {
        let index = self.mark_index(loc);
        if !self.marked[index] {
            self.marked[index] = true;
            self.actions.push(loc, score);
        }
    }

    /// Add a move, overriding the score if it is already listed.
    fn add_override(&mut self, loc: Loc, score: Score) {
        let index = self.mark_index(loc);
        if self.marked[index] {
            self.actions.rescore(loc, score);
        } else {
            self.marked[index] = true;
            self.actions.push(loc, score);
        }
    }

    fn add_all(&mut self, locs: &[Loc], score: Score) {
        for &loc in locs {
            self.add(loc, score);
        }
    }

    /// Snapshot of a histogram bucket; the borrow checker will not let
    /// us iterate it while probing forbidden moves.
    fn threats(&self, sign: Sign, threat: ThreatType) -> Vec<Loc> {
        self.calc.histogram(sign).get(threat).to_vec()
    }

    fn add_bucket(&mut self, sign: Sign, threat: ThreatType, score: Score) {
        let locs = self.threats(sign, threat);
        self.add_all(&locs, score);
    }

    fn own_threat_at(&self, loc: Loc) -> ThreatType {
        self.calc.threat_at(self.own, loc)
    }

    fn opp_threat_at(&self, loc: Loc) -> ThreatType {
        self.calc.threat_at(self.opp, loc)
    }

    /// Defensive moves for the side to move against the opposing
    /// threat at `loc` along `dir`, with renju adjustments: own
    /// forbidden defenses are listed as immediate losses and removed,
    /// and a cross straight-four whose far end is forbidden grants one
    /// extra defensive cell.
    fn defensive_moves(&mut self, loc: Loc, dir: Direction) -> LocList<8> {
        let mut result = self.calc.defensive_moves(self.own, loc, dir);
        if self.rules.forbidden_for(self.own) {
            let mut i = 0;
            while i < result.len() {
                let cell = result.get(i);
                if self.calc.is_forbidden(self.own, cell) {
                    self.add_override(cell, Score::loss_in(1));
                    result.remove_at(i);
                } else {
                    i += 1;
                }
            }
        } else if self.rules.forbidden_for(self.opp)
            && self.calc.pattern_at(self.opp, loc, dir) == PatternType::OpenFour
        {
            for side in [-1i32, 1] {
                let three_adjacent = (1..=3).all(|k| {
                    let (r, c) = dir.shift(loc, side * k);
                    self.calc.in_board(r, c)
                        && self.calc.sign_at(Loc::new(r as u8, c as u8)) == self.opp
                });
                if !three_adjacent {
                    continue;
                }
                let (fr, fc) = dir.shift(loc, side * 4);
                if self.calc.in_board(fr, fc) {
                    let far = Loc::new(fr as u8, fc as u8);
                    if self.calc.is_forbidden(self.opp, far) {
                        let (nr, nc) = dir.shift(loc, -side);
                        if self.calc.in_board(nr, nc) {
                            result.push(Loc::new(nr as u8, nc as u8));
                        }
                    }
                }
            }
        }
        result
    }

    // ── Tactical ladder ─────────────────────────────────────────────────────

    fn try_win_in_1(&mut self) -> Flow {
        let fives = self.threats(self.own, ThreatType::Five);
        if fives.is_empty() {
            return Flow::Continue;
        }
        self.actions.has_initiative = true;
        self.add_all(&fives, Score::win_in(1));
        self.actions.baseline_score = Score::win_in(1);
        Flow::Stop(Score::win_in(1))
    }

    fn try_draw_in_1(&mut self) -> Flow {
        self.actions.baseline_score = Score::draw_in(1);
        if self.rules.forbidden_for(self.own) {
            let mut fork_candidates = Vec::new();
            for row in 0..self.rows as u8 {
                for col in 0..self.cols as u8 {
                    let loc = Loc::new(row, col);
                    if self.calc.sign_at(loc) != Sign::None {
                        continue;
                    }
                    match self.own_threat_at(loc) {
                        ThreatType::Fork3x3 => fork_candidates.push(loc),
                        ThreatType::Fork4x4 | ThreatType::Overline => {
                            self.add(loc, Score::loss_in(1));
                        }
                        _ => {
                            self.add(loc, Score::draw_in(1));
                            return Flow::Stop(Score::draw_in(1));
                        }
                    }
                }
            }
            // only 3x3 forks are left; the add/undo probe decides
            for loc in fork_candidates {
                if self.calc.is_forbidden(self.own, loc) {
                    self.add(loc, Score::loss_in(1));
                } else {
                    self.add(loc, Score::draw_in(1));
                    return Flow::Stop(Score::draw_in(1));
                }
            }
            self.actions.baseline_score = Score::loss_in(1);
            Flow::Stop(Score::loss_in(1))
        } else {
            for row in 0..self.rows as u8 {
                for col in 0..self.cols as u8 {
                    let loc = Loc::new(row, col);
                    if self.calc.sign_at(loc) == Sign::None {
                        self.add(loc, Score::draw_in(1));
                        return Flow::Stop(Score::draw_in(1));
                    }
                }
            }
            Flow::Stop(Score::draw_in(1))
        }
    }

    fn defend_loss_in_2(&mut self) -> Flow {
        let opponent_fives = self.threats(self.opp, ThreatType::Five);
        if opponent_fives.is_empty() {
            return Flow::Continue;
        }
        self.actions.must_defend = true;

        let mut defense = DefenseIntersection::new();
        for &threat in &opponent_fives {
            let group = self.calc.patterns_at(self.opp, threat);
            let dir = group.find(PatternType::Five).expect("five threat without five pattern");
            let moves = self.defensive_moves(threat, dir);
            defense.intersect_with(&moves);
            if defense.is_empty() {
                // not refutable; still produce the threat cells
                self.add_all(&opponent_fives, Score::loss_in(2));
                self.actions.baseline_score = Score::loss_in(2);
                return Flow::Stop(Score::loss_in(2));
            }
        }

        let mut best = Score::MIN;
        for &cell in defense.list() {
            let mut response = Score::UNKNOWN;
            match self.own_threat_at(cell) {
                ThreatType::Fork3x3 => {
                    if self.rules.forbidden_for(self.own) {
                        // an open four can hide inside a legal 3x3 fork
                        if self.calc.patterns_at(self.own, cell).contains(PatternType::OpenFour) {
                            self.actions.has_initiative = true;
                            response = Score::win_in(3);
                        }
                    } else if !self.calc.histogram(self.opp).has_any_four() {
                        self.actions.has_initiative = true;
                        response = Score::win_in(5);
                    }
                }
                ThreatType::Fork4x3 => {
                    let solved = self.try_solve_own_fork_4x3(cell);
                    if solved.is_win() {
                        self.actions.has_initiative = true;
                        response = solved;
                    }
                }
                ThreatType::Fork4x4 | ThreatType::OpenFour => {
                    self.actions.has_initiative = true;
                    response = Score::win_in(3);
                }
                _ => {
                    if self.calc.patterns_at(self.own, cell).contains(PatternType::HalfOpenFour) {
                        self.actions.has_initiative = true;
                        if self.rules.forbidden_for(self.opp) {
                            let solved = self.try_solve_foul_attack(cell);
                            if solved.is_win() {
                                response = solved;
                            }
                        } else {
                            response = Score::eval(PRIOR_OWN_HALF_OPEN_FOUR);
                        }
                    }
                }
            }
            self.add(cell, response);
            best = best.max(response);
        }
        Flow::Stop(best)
    }

    fn try_win_in_3(&mut self) -> Flow {
        let mut winning = 0usize;
        if self.rules.forbidden_for(self.own) {
            // open four hidden inside a legal 3x3 fork (rare, cheap)
            let forks = self.threats(self.own, ThreatType::Fork3x3);
            for loc in forks {
                if self.calc.patterns_at(self.own, loc).contains(PatternType::OpenFour)
                    && !self.calc.is_forbidden(self.own, loc)
                {
                    winning += 1;
                    self.add(loc, Score::win_in(3));
                }
            }
        }

        let open_fours = self.threats(self.own, ThreatType::OpenFour);
        if self.rules.forbidden_for(self.own) {
            // an open four doubled with a second four is forbidden
            for loc in open_fours {
                if !self.calc.is_forbidden(self.own, loc) {
                    winning += 1;
                    self.add(loc, Score::win_in(3));
                }
            }
        } else {
            winning += open_fours.len();
            self.add_all(&open_fours, Score::win_in(3));
        }
        if winning > 0 {
            self.actions.has_initiative = true;
            self.actions.baseline_score = Score::win_in(3);
            return Flow::Stop(Score::win_in(3));
        }

        let forks_4x4 = self.threats(self.own, ThreatType::Fork4x4);
        if !forks_4x4.is_empty() && !self.rules.forbidden_for(self.own) {
            self.actions.has_initiative = true;
            self.add_all(&forks_4x4, Score::win_in(3));
            self.actions.baseline_score = Score::win_in(3);
            return Flow::Stop(Score::win_in(3));
        }

        if self.rules.forbidden_for(self.opp) {
            // circle can win by forcing cross into a forbidden reply
            let half_fours = self.threats(self.own, ThreatType::HalfOpenFour);
            for loc in half_fours {
                let solved = self.try_solve_foul_attack(loc);
                if solved.is_win() {
                    self.add(loc, solved);
                    self.actions.has_initiative = true;
                    return Flow::Stop(solved);
                }
            }
        }
        Flow::Continue
    }

    fn defend_loss_in_4(&mut self) -> Flow {
        let has_any_four = self.calc.histogram(self.own).has_any_four();
        self.actions.baseline_score = Score::loss_in(4);

        if self.rules != GameRules::Renju {
            let mut defense = DefenseIntersection::new();

            let open_fours = self.threats(self.opp, ThreatType::OpenFour);
            for &threat in &open_fours {
                self.actions.must_defend = true;
                let group = self.calc.patterns_at(self.opp, threat);
                let dir = group.find(PatternType::OpenFour).expect("open-4 threat without pattern");
                let moves = self.defensive_moves(threat, dir);
                defense.intersect_with(&moves);
                if defense.is_empty() && !has_any_four {
                    self.add_all(&open_fours, Score::loss_in(4));
                    return Flow::Stop(Score::loss_in(4));
                }
            }

            let forks = self.threats(self.opp, ThreatType::Fork4x4);
            for &threat in &forks {
                self.actions.must_defend = true;
                let group = self.calc.patterns_at(self.opp, threat);

                // open and double fours must all be refuted by one move
                for dir in Direction::ALL {
                    if matches!(group.get(dir), PatternType::OpenFour | PatternType::DoubleFour) {
                        let moves = self.defensive_moves(threat, dir);
                        defense.intersect_with(&moves);
                    }
                }
                // half-open-four components only need all-but-one
                // refuted; the union over-generates but never omits
                if group.count(PatternType::HalfOpenFour) > 0 {
                    let mut union: Vec<Loc> = Vec::new();
                    for dir in Direction::ALL {
                        if group.get(dir) == PatternType::HalfOpenFour {
                            for cell in self.defensive_moves(threat, dir).iter() {
                                if !union.contains(&cell) {
                                    union.push(cell);
                                }
                            }
                        }
                    }
                    defense.intersect_with_slice(&union);
                }

                if defense.is_empty() && !has_any_four {
                    self.add_all(&forks, Score::loss_in(4));
                    return Flow::Stop(Score::loss_in(4));
                }
            }
            let cells: Vec<Loc> = defense.list().to_vec();
            self.add_all(&cells, Score::UNKNOWN);
        } else {
            // renju: dependencies between defenses and forbidden moves
            // are too tangled to intersect soundly, so add everything
            let open_fours = self.threats(self.opp, ThreatType::OpenFour);
            for &threat in &open_fours {
                self.actions.must_defend = true;
                let group = self.calc.patterns_at(self.opp, threat);
                let dir = group.find(PatternType::OpenFour).expect("open-4 threat without pattern");
                let moves = self.defensive_moves(threat, dir);
                for cell in moves.iter() {
                    self.add(cell, Score::UNKNOWN);
                }
            }

            if self.rules.forbidden_for(self.opp) {
                // an open four hidden inside a legal cross 3x3 fork
                let forks = self.threats(self.opp, ThreatType::Fork3x3);
                for loc in forks {
                    let group = self.calc.patterns_at(self.opp, loc);
                    if group.contains(PatternType::OpenFour) && !self.calc.is_forbidden(self.opp, loc) {
                        self.actions.must_defend = true;
                        let dir = group.find(PatternType::OpenFour).expect("checked above");
                        let moves = self.defensive_moves(loc, dir);
                        for cell in moves.iter() {
                            self.add(cell, Score::UNKNOWN);
                        }
                    }
                }
            }

            if !self.rules.forbidden_for(self.opp) {
                let forks = self.threats(self.opp, ThreatType::Fork4x4);
                for &threat in &forks {
                    self.actions.must_defend = true;
                    let group = self.calc.patterns_at(self.opp, threat);
                    for dir in Direction::ALL {
                        if group.get(dir).is_four() {
                            let moves = self.defensive_moves(threat, dir);
                            for cell in moves.iter() {
                                self.add(cell, Score::UNKNOWN);
                            }
                        }
                    }
                }
            }
        }

        if self.actions.must_defend {
            self.actions.has_initiative = has_any_four;
            let best = self.add_own_4x3_forks();
            self.add_own_half_open_fours();
            if best.is_win() {
                return Flow::Stop(best);
            }
            return Flow::Stop(Score::UNKNOWN);
        }
        self.actions.baseline_score = Score::UNKNOWN;
        Flow::Continue
    }

    fn try_win_in_5(&mut self) -> Flow {
        let mut best = self.add_own_4x3_forks();

        if !self.rules.forbidden_for(self.own)
            && !self.calc.histogram(self.opp).has_any_four()
        {
            let forks = self.threats(self.own, ThreatType::Fork3x3);
            if !forks.is_empty() {
                self.add_all(&forks, Score::win_in(5));
                best = best.max(Score::win_in(5));
            }
        }

        if best.is_win() {
            self.actions.has_initiative = true;
            self.actions.baseline_score = best;
            return Flow::Stop(best);
        }
        Flow::Continue
    }

    fn defend_loss_in_6(&mut self) -> Flow {
        if self.calc.histogram(self.own).has_any_four() {
            return Flow::Continue;
        }

        let forks_4x3 = self.threats(self.opp, ThreatType::Fork4x3);
        let forks_3x3 = self.threats(self.opp, ThreatType::Fork3x3);
        if !forks_4x3.is_empty() || !forks_3x3.is_empty() {
            self.actions.must_defend = true;
            self.actions.baseline_score = Score::loss_in(6);
        }

        for &fork in &forks_4x3 {
            let group = self.calc.patterns_at(self.opp, fork);

            for dir in Direction::ALL {
                if group.get(dir) == PatternType::OpenThree {
                    let moves = self.defensive_moves(fork, dir);
                    for cell in moves.iter() {
                        self.add(cell, Score::UNKNOWN);
                    }
                }
            }

            // defenses to the half-open four, plus nearby cells from
            // which we might regain the initiative
            if let Some(dir) = group.find(PatternType::HalfOpenFour) {
                let four_defenses = self.defensive_moves(fork, dir);
                for cell in four_defenses.iter() {
                    self.add(cell, Score::UNKNOWN);
                }
                for cell in four_defenses.iter() {
                    for scan_dir in Direction::ALL {
                        for i in -4i32..=4 {
                            if i == 0 {
                                continue;
                            }
                            let (r, c) = scan_dir.shift(cell, i);
                            if !self.calc.in_board(r, c) {
                                continue;
                            }
                            let spot = Loc::new(r as u8, c as u8);
                            if self.calc.sign_at(spot) == Sign::None
                                && self.calc.pattern_at(self.own, spot, scan_dir) > PatternType::None
                            {
                                self.add(spot, Score::UNKNOWN);
                            }
                        }
                    }
                }
            }
        }

        if !forks_3x3.is_empty() {
            for &fork in &forks_3x3 {
                let group = self.calc.patterns_at(self.opp, fork);
                for dir in Direction::ALL {
                    if group.get(dir) == PatternType::OpenThree {
                        let moves = self.defensive_moves(fork, dir);
                        for cell in moves.iter() {
                            self.add(cell, Score::UNKNOWN);
                        }
                    }
                }
            }
            self.add_bucket(self.own, ThreatType::Fork3x3, Score::eval(PRIOR_OWN_FORK_3X3));
            self.add_bucket(self.own, ThreatType::OpenThree, Score::eval(PRIOR_OWN_OPEN_THREE));

            // own half-open threes reachable from the star mask can
            // rebuild threats while parrying
            let star = self.star_mask(self.own);
            for row in 0..self.rows {
                let mut bits = star[row];
                while bits != 0 {
                    let col = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    let spot = Loc::new(row as u8, col as u8);
                    if self.marked[self.mark_index(spot)] {
                        continue;
                    }
                    if Direction::ALL
                        .iter()
                        .any(|&d| self.calc.is_half_open_three_at(spot, d, self.own))
                    {
                        self.add(spot, Score::eval(PRIOR_OWN_OPEN_THREE));
                    }
                }
            }
        }

        if self.actions.must_defend {
            self.add_own_half_open_fours();
            return Flow::Stop(Score::UNKNOWN);
        }
        Flow::Continue
    }

    // ── Shared helpers ──────────────────────────────────────────────────────

    fn add_own_4x3_forks(&mut self) -> Score {
        let mut best = Score::UNKNOWN;
        let forks = self.threats(self.own, ThreatType::Fork4x3);
        for loc in forks {
            let solved = self.try_solve_own_fork_4x3(loc);
            self.add_override(loc, solved);
            if solved.is_proven() {
                best = best.max(solved);
            }
        }
        best
    }

    fn add_own_half_open_fours(&mut self) -> usize {
        let mut hidden = 0usize;
        if self.rules.forbidden_for(self.own) {
            // a half-open four can hide inside a legal 3x3 fork
            let forks = self.threats(self.own, ThreatType::Fork3x3);
            for loc in forks {
                if self.calc.patterns_at(self.own, loc).contains(PatternType::HalfOpenFour)
                    && !self.calc.is_forbidden(self.own, loc)
                {
                    self.add(loc, Score::eval(PRIOR_OWN_HALF_OPEN_FOUR));
                    hidden += 1;
                }
            }
        }
        let fours = self.threats(self.own, ThreatType::HalfOpenFour);
        self.add_all(&fours, Score::eval(PRIOR_OWN_HALF_OPEN_FOUR));
        hidden + fours.len()
    }

    /// Statically resolve a 4x3 fork by looking at the opponent's
    /// forced reply to the four component.
    fn try_solve_own_fork_4x3(&mut self, loc: Loc) -> Score {
        debug_assert_eq!(self.own_threat_at(loc), ThreatType::Fork4x3);
        if self.rules.forbidden_for(self.own) {
            // a forbidden move may later appear inside the three
            return Score::UNKNOWN;
        }

        let group = self.calc.patterns_at(self.own, loc);
        let Some(dir) = group.find(PatternType::HalfOpenFour) else {
            return Score::UNKNOWN;
        };
        let mut replies = self.calc.defensive_moves(self.opp, loc, dir);
        replies.remove(loc);

        let mut strongest = ThreatType::None;
        for reply in replies.iter() {
            strongest = strongest.max(self.opp_threat_at(reply));
        }
        match strongest {
            ThreatType::None | ThreatType::HalfOpenThree | ThreatType::OpenThree => {
                Score::win_in(5)
            }
            // a forbidden 3x3 reply would even win faster, but the
            // slower proof is a proof all the same
            ThreatType::Fork3x3 => Score::win_in(5),
            ThreatType::HalfOpenFour | ThreatType::Fork4x3 => Score::UNKNOWN,
            ThreatType::Fork4x4 => {
                if self.rules.forbidden_for(self.opp) {
                    Score::win_in(3)
                } else {
                    Score::loss_in(4)
                }
            }
            ThreatType::OpenFour => Score::loss_in(4),
            ThreatType::Five => Score::loss_in(2),
            ThreatType::Overline => {
                if self.rules.forbidden_for(self.opp) {
                    Score::win_in(3)
                } else {
                    Score::loss_in(2)
                }
            }
        }
    }

    /// Renju circle only: a half-open four whose sole reply square is
    /// forbidden for cross wins outright.
    fn try_solve_foul_attack(&mut self, loc: Loc) -> Score {
        if !self.rules.forbidden_for(self.opp) {
            return Score::UNKNOWN;
        }
        let group = self.calc.patterns_at(self.own, loc);
        if group.count(PatternType::HalfOpenFour) != 1 {
            return Score::UNKNOWN;
        }
        let dir = group.find(PatternType::HalfOpenFour).expect("counted above");
        // all replies, forbidden ones included
        let replies = self.calc.defensive_moves(self.opp, loc, dir);
        if replies.len() != 2 {
            return Score::UNKNOWN;
        }
        let response = if replies.get(0) == loc { replies.get(1) } else { replies.get(0) };
        match self.opp_threat_at(response) {
            ThreatType::Fork3x3 => {
                let reply_group = self.calc.patterns_at(self.opp, response);
                if reply_group.get(dir) != PatternType::OpenThree
                    && self.calc.is_forbidden(self.opp, response)
                {
                    Score::win_in(3)
                } else {
                    Score::UNKNOWN
                }
            }
            ThreatType::Fork4x4 | ThreatType::Overline => Score::win_in(3),
            _ => Score::UNKNOWN,
        }
    }

    fn mark_forbidden_moves(&mut self) {
        let overlines = self.threats(self.own, ThreatType::Overline);
        for loc in overlines {
            self.add_override(loc, Score::loss_in(1));
        }
        let forks_4x4 = self.threats(self.own, ThreatType::Fork4x4);
        for loc in forks_4x4 {
            self.add_override(loc, Score::loss_in(1));
        }
        // open fours doubled with another four, and 3x3 forks, need
        // the calculator's full check
        for bucket in [ThreatType::OpenFour, ThreatType::Fork3x3] {
            let candidates = self.threats(self.own, bucket);
            for loc in candidates {
                if self.calc.is_forbidden(self.own, loc) {
                    self.add_override(loc, Score::loss_in(1));
                }
            }
        }
    }

    // ── Quiet-move fill ─────────────────────────────────────────────────────

    fn fill_remaining(&mut self, mode: GeneratorMode) {
        let mask = if mode <= GeneratorMode::Reduced {
            self.neighbourhood_mask()
        } else {
            (0..self.rows).map(|r| self.calc.empty_mask_row(r)).collect()
        };
        for row in 0..self.rows {
            let mut bits = mask[row];
            while bits != 0 {
                let col = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                self.add(Loc::new(row as u8, col as u8), Score::UNKNOWN);
            }
        }
    }

    fn stamp(&self, mask: &mut [u32], row: usize, col: usize, shape: &[u32; 7]) {
        let width_mask = (1u32 << self.cols) - 1;
        for (k, &bits) in shape.iter().enumerate() {
            let rr = row as i32 + k as i32 - 3;
            if rr < 0 || rr >= self.rows as i32 {
                continue;
            }
            let shifted = if col >= 3 { bits << (col - 3) } else { bits >> (3 - col) };
            mask[rr as usize] |= shifted & width_mask;
        }
    }

    /// 7x7 neighbourhood of every stone, restricted to empty cells.
    /// On an empty board, just the centre.
    fn neighbourhood_mask(&self) -> Vec<u32> {
        let mut mask = vec![0u32; self.rows];
        let mut any_stone = false;
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.calc.sign_at(Loc::new(row as u8, col as u8)).is_stone() {
                    any_stone = true;
                    self.stamp(&mut mask, row, col, &NEIGHBOURHOOD);
                }
            }
        }
        if !any_stone {
            mask[self.rows / 2] |= 1 << (self.cols / 2);
        }
        for row in 0..self.rows {
            mask[row] &= self.calc.empty_mask_row(row);
        }
        mask
    }

    /// Star-shaped line extensions of `sign`'s stones, restricted to
    /// empty cells.
    fn star_mask(&self, sign: Sign) -> Vec<u32> {
        let mut mask = vec![0u32; self.rows];
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.calc.sign_at(Loc::new(row as u8, col as u8)) == sign {
                    self.stamp(&mut mask, row, col, &STAR);
                }
            }
        }
        for row in 0..self.rows {
            mask[row] &= self.calc.empty_mask_row(row);
        }
        mask
    }
}

/// Running intersection of defensive-move sets across threats.
struct DefenseIntersection {
    initialized: bool,
    list: Vec<Loc>,
}

impl DefenseIntersection {
    fn new() -> DefenseIntersection {
        DefenseIntersection { initialized: false, list: Vec::new() }
    }

    fn intersect_with(&mut self, other: &LocList<8>) {
        if !self.initialized {
            self.initialized = true;
            self.list.extend(other.iter());
        } else {
            self.list.retain(|loc| other.contains(*loc));
        }
    }

    fn intersect_with_slice(&mut self, other: &[Loc]) {
        if !self.initialized {
            self.initialized = true;
            self.list.extend_from_slice(other);
        } else {
            self.list.retain(|loc| other.contains(loc));
        }
    }

    fn is_empty(&self) -> bool {
        self.initialized && self.list.is_empty()
    }

    fn list(&self) -> &[Loc] {
        &self.list
    }
}
