//! End-to-end search behaviour across the generator, solver, and tree.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use renza_core::{Board, GameRules, Loc, Move, PatternCalculator, Score, Sign, ThreatType};
use renza_engine::{
    ActionList, EngineConfig, GeneratorMode, MoveGenerator, ProvenValue, SearchControl,
    SearchDriver, SharedHashTable, TssConfig, TssSolver, UniformEvaluator,
};

fn driver_for(rows: usize, cols: usize, rules: GameRules, max_nodes: u64) -> SearchDriver {
    let config = EngineConfig {
        rows,
        columns: cols,
        rules,
        max_nodes,
        hash_size_mb: 8,
        ..EngineConfig::default()
    };
    SearchDriver::new(config, Box::new(UniformEvaluator))
}

fn control() -> SearchControl {
    SearchControl::infinite(Arc::new(AtomicBool::new(false)))
}

#[test]
fn mcts_empty_board_runs_exact_simulation_budget() {
    let mut driver = driver_for(15, 15, GameRules::Freestyle, 400);
    let board = Board::square(15).unwrap();

    let report = driver.search(&board, Sign::Cross, &control(), |_| {});

    assert_eq!(report.simulations, 400);
    assert_eq!(report.root_visits, 400, "root visit sum must match the budget");
    let best = report.best_move.expect("must pick a move");
    assert!(board.is_empty_at(best), "best move must be legal");
    assert!(!report.pv.is_empty(), "principal variation must be non-empty");
}

#[test]
fn mcts_proves_immediate_tactics() {
    // an open three on the move: the solver proves the win at the root
    let mut driver = driver_for(9, 9, GameRules::Freestyle, 400);
    let board = Board::from_rows(&[
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ X X X _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ O O _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
    ])
    .unwrap();

    let report = driver.search(&board, Sign::Cross, &control(), |_| {});
    assert_eq!(report.proven, ProvenValue::Win);
    let best = report.best_move.unwrap();
    // either extension of the three wins
    assert!(
        best == Loc::new(4, 1) || best == Loc::new(4, 5),
        "{best} does not extend the open three"
    );
}

#[test]
fn tss_two_open_fours_for_the_opponent_lose_within_budget() {
    let board = Board::from_rows(&[
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ O O O _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ O O O _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _ _ _ _ _ _ _",
    ])
    .unwrap();
    let mut calc = PatternCalculator::new(GameRules::Freestyle, 15, 15);
    calc.set_board(&board, Sign::Cross);

    let config = TssConfig { max_positions: 500, ..TssConfig::default() };
    let mut solver = TssSolver::new(config, Arc::new(SharedHashTable::new(8)), 15, 15);
    assert_eq!(solver.solve(&mut calc), Score::loss_in(4));
    assert!(solver.last_position_count() <= 500);
}

#[test]
fn calculator_is_reversible_over_long_sequences() {
    let mut calc = PatternCalculator::new(GameRules::Standard, 15, 15);
    let board = Board::square(15).unwrap();
    calc.set_board(&board, Sign::Cross);
    let initial_hash = calc.hash();

    // a deterministic pseudo-random game prefix
    let mut seed = 0x1234_5678_9abc_def0u64;
    let mut moves = Vec::new();
    let mut sign = Sign::Cross;
    while moves.len() < 40 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let loc = Loc::new(((seed >> 16) % 15) as u8, ((seed >> 40) % 15) as u8);
        if calc.sign_at(loc) != Sign::None {
            continue;
        }
        let mv = Move::new(sign, loc);
        calc.add_move(mv);
        moves.push(mv);
        sign = sign.invert();
    }

    for mv in moves.iter().rev() {
        calc.undo_move(*mv);
    }

    assert_eq!(calc.hash(), initial_hash);
    assert_eq!(calc.current_depth(), 0);
    for row in 0..15u8 {
        for col in 0..15u8 {
            let loc = Loc::new(row, col);
            assert_eq!(calc.sign_at(loc), Sign::None);
            assert_eq!(calc.threat_at(Sign::Cross, loc), ThreatType::None, "{loc}");
            assert_eq!(calc.threat_at(Sign::Circle, loc), ThreatType::None, "{loc}");
        }
    }
}

#[test]
fn histogram_stays_consistent_during_play() {
    let mut calc = PatternCalculator::new(GameRules::Freestyle, 11, 11);
    let board = Board::square(11).unwrap();
    calc.set_board(&board, Sign::Cross);

    let script = [
        (Sign::Cross, 5u8, 5u8),
        (Sign::Circle, 4, 4),
        (Sign::Cross, 5, 6),
        (Sign::Circle, 4, 5),
        (Sign::Cross, 5, 7),
        (Sign::Circle, 4, 6),
        (Sign::Cross, 5, 8),
        (Sign::Circle, 4, 7),
    ];
    for (sign, row, col) in script {
        calc.add_move(Move::new(sign, Loc::new(row, col)));

        for check_sign in Sign::PLAYERS {
            for row in 0..11u8 {
                for col in 0..11u8 {
                    let loc = Loc::new(row, col);
                    let threat = calc.threat_at(check_sign, loc);
                    if threat != ThreatType::None {
                        assert!(
                            calc.histogram(check_sign).get(threat).contains(&loc),
                            "{check_sign} {threat} at {loc} missing from histogram"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn must_defend_lists_are_complete() {
    // circle has a four; any cross move outside the returned list
    // leaves circle a five on the next move
    let board = Board::from_rows(&[
        "_ _ _ _ _ _ _ _ _",
        "_ O O O O _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ X X _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
    ])
    .unwrap();
    let mut calc = PatternCalculator::new(GameRules::Freestyle, 9, 9);
    calc.set_board(&board, Sign::Cross);

    let mut movegen = MoveGenerator::new(9, 9);
    let mut actions = ActionList::new();
    movegen.generate(&mut calc, &mut actions, GeneratorMode::Optimal);
    assert!(actions.must_defend);

    for row in 0..9u8 {
        for col in 0..9u8 {
            let loc = Loc::new(row, col);
            if calc.sign_at(loc) != Sign::None || actions.contains(loc) {
                continue;
            }
            calc.add_move(Move::new(Sign::Cross, loc));
            let circle_fives = calc.histogram(Sign::Circle).get(ThreatType::Five);
            assert!(
                !circle_fives.is_empty(),
                "unlisted move {loc} does not lose immediately"
            );
            calc.undo_move(Move::new(Sign::Cross, loc));
        }
    }
}

#[test]
fn proven_root_stops_early() {
    let mut driver = driver_for(9, 9, GameRules::Freestyle, 10_000);
    let board = Board::from_rows(&[
        "X X X X ! _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ O O _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
        "_ _ _ _ _ _ _ _ _",
    ])
    .unwrap();
    let report = driver.search(&board, Sign::Cross, &control(), |_| {});
    assert_eq!(report.proven, ProvenValue::Win);
    assert_eq!(report.best_move, Some(Loc::new(0, 4)));
    assert!(
        report.simulations < 100,
        "proven root must not burn the full budget, used {}",
        report.simulations
    );
}

#[test]
fn external_stop_aborts_the_search() {
    use std::sync::atomic::Ordering;

    let mut driver = driver_for(15, 15, GameRules::Freestyle, 0);
    let board = Board::square(15).unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let stop_control = SearchControl::infinite(Arc::clone(&flag));

    // pre-set stop: the search must exit at its first safe point
    flag.store(true, Ordering::Release);
    let report = driver.search(&board, Sign::Cross, &stop_control, |_| {});
    assert_eq!(report.simulations, 0);
}
