//! The search driver: batches leaves between the tree, the solver,
//! and the evaluator.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use renza_core::{Board, Loc, PatternCalculator, Sign};

use crate::action::ActionList;
use crate::config::EngineConfig;
use crate::control::SearchControl;
use crate::eval::{EvalOutput, EvalRequest, Evaluator};
use crate::mcts::{
    Edge, EdgeSelector, Node, NodeKey, ProvenValue, Selection, Tree, TreeConfig, Value,
};
use crate::movegen::{GeneratorMode, MoveGenerator};
use crate::tss::{SharedHashTable, TssConfig, TssSolver};

/// Realtime progress notifications, forwarded to protocol front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeEvent {
    Refresh,
    Pos(Loc),
    Done(Loc),
    Lose(Loc),
    Best(Loc),
}

/// Final outcome of one search call.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best_move: Option<Loc>,
    pub pv: Vec<Loc>,
    /// Root value estimate for the side to move.
    pub value: Value,
    pub proven: ProvenValue,
    pub simulations: u64,
    /// Visits recorded at the root node.
    pub root_visits: u32,
    pub node_count: usize,
}

struct PendingLeaf {
    selection: Selection,
    key: NodeKey,
    to_move: Sign,
    actions: ActionList,
    board: Board,
}

/// Owns one worker's calculator, solver, tree, and evaluator, and
/// runs the select / solve / evaluate / backup loop.
pub struct SearchDriver {
    config: EngineConfig,
    calc: PatternCalculator,
    movegen: MoveGenerator,
    tss: TssSolver,
    tree: Tree,
    evaluator: Box<dyn Evaluator>,
    selector: EdgeSelector,
    rng: SmallRng,
    use_root_noise: bool,
}

impl SearchDriver {
    pub fn new(config: EngineConfig, evaluator: Box<dyn Evaluator>) -> SearchDriver {
        let table = Arc::new(SharedHashTable::new(config.hash_size_mb));
        let tree_config = TreeConfig { node_capacity: config.node_capacity(), ..TreeConfig::default() };
        let selector = EdgeSelector::Puct { exploration: tree_config.exploration };
        SearchDriver {
            calc: PatternCalculator::new(config.rules, config.rows, config.columns),
            movegen: MoveGenerator::new(config.rows, config.columns),
            tss: TssSolver::new(TssConfig::default(), table, config.rows, config.columns),
            tree: Tree::new(tree_config),
            evaluator,
            selector,
            rng: SmallRng::seed_from_u64(0x7265_6e7a_6121),
            use_root_noise: false,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Switch root-prior Dirichlet noise on or off (self-play mode).
    pub fn set_root_noise(&mut self, enabled: bool) {
        self.use_root_noise = enabled;
        let exploration = self.tree.config().exploration;
        self.selector = if enabled {
            EdgeSelector::NoisyPuct {
                exploration,
                noise_weight: self.tree.config().noise_weight,
                noise_alpha: self.tree.config().noise_alpha,
            }
        } else {
            EdgeSelector::Puct { exploration }
        };
    }

    /// Forget everything: tree, node cache, and solver hash table.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.tss.table().clear();
    }

    /// Run simulations from `board` until a stop condition fires.
    pub fn search<F>(
        &mut self,
        board: &Board,
        to_move: Sign,
        control: &SearchControl,
        mut on_event: F,
    ) -> SearchReport
    where
        F: FnMut(RealtimeEvent),
    {
        let root_key = (board.hash(), board.stone_count() as u32);
        self.tree.set_root(root_key);
        on_event(RealtimeEvent::Refresh);

        let max_simulations = if self.config.max_nodes == 0 { u64::MAX } else { self.config.max_nodes };
        let mut simulations = 0u64;

        // expand the root synchronously before batching so concurrent
        // walks have a node to diverge from
        if simulations < max_simulations
            && !control.should_stop(simulations)
            && self.tree.root_node().is_none()
        {
            let selection = self.tree.select(&self.selector);
            debug_assert!(selection.needs_expansion());
            match self.prepare_leaf(board, to_move, selection) {
                LeafState::Solved => simulations += 1,
                LeafState::NeedsEvaluation(leaf) => {
                    let request =
                        EvalRequest { board: leaf.board.clone(), to_move: leaf.to_move };
                    let output = self
                        .evaluator
                        .evaluate_batch(&[request])
                        .pop()
                        .expect("evaluator must answer every request");
                    self.finish_leaf(leaf, output);
                    simulations += 1;
                }
            }
        }
        let root_edges: Vec<Loc> = self
            .tree
            .root_node()
            .map(|root| root.edges.iter().map(|e| e.loc).collect())
            .unwrap_or_default();
        for &loc in &root_edges {
            on_event(RealtimeEvent::Pos(loc));
        }
        for &loc in &root_edges {
            on_event(RealtimeEvent::Done(loc));
        }
        if !root_edges.is_empty() && self.use_root_noise {
            self.tree.apply_root_noise(&mut self.rng);
        }

        while simulations < max_simulations && !control.should_stop(simulations) {
            if self.tree.root_node().is_some_and(|n| n.proven.is_proven()) {
                break;
            }

            let batch_limit = self.evaluator.max_batch_size().max(1);
            let mut pending: Vec<PendingLeaf> = Vec::with_capacity(batch_limit);

            while pending.len() < batch_limit
                && simulations + (pending.len() as u64) < max_simulations
            {
                if control.should_stop(simulations) {
                    break;
                }
                let selection = self.tree.select(&self.selector);
                if let Some(leaf) = selection.leaf {
                    // terminal or proven node: its value backs up as-is
                    let (value, proven) = {
                        let node = self.tree.node(leaf).expect("selected leaf must exist");
                        (node.proven.to_value().unwrap_or(node.value), node.proven)
                    };
                    self.tree.backup(&selection, value, proven);
                    simulations += 1;
                    if simulations >= max_simulations || self.root_proven() {
                        break;
                    }
                    continue;
                }
                if selection.path.len() >= self.config.max_depth {
                    // depth cap: score the frontier with a neutral value
                    self.tree.backup(&selection, Value::default(), ProvenValue::Unknown);
                    simulations += 1;
                    continue;
                }
                match self.prepare_leaf(board, to_move, selection) {
                    LeafState::Solved => {
                        simulations += 1;
                        if self.root_proven() {
                            break;
                        }
                    }
                    LeafState::NeedsEvaluation(leaf) => {
                        // two walks in one batch can reach the same
                        // unexpanded key; a duplicate would double-insert
                        // the node and double-count ancestor visits, so
                        // drop the walk and close the batch instead
                        if pending.iter().any(|p| p.key == leaf.key) {
                            self.tree.cancel_virtual_loss(&leaf.selection);
                            break;
                        }
                        pending.push(leaf);
                    }
                }
            }

            if !pending.is_empty() {
                let requests: Vec<EvalRequest> = pending
                    .iter()
                    .map(|leaf| EvalRequest { board: leaf.board.clone(), to_move: leaf.to_move })
                    .collect();
                let outputs = self.evaluator.evaluate_batch(&requests);
                debug_assert_eq!(outputs.len(), pending.len());
                for (leaf, output) in pending.into_iter().zip(outputs) {
                    self.finish_leaf(leaf, output);
                    simulations += 1;
                }
            }
        }

        self.report(&mut on_event, simulations)
    }

    fn root_proven(&self) -> bool {
        self.tree.root_node().is_some_and(|n| n.proven.is_proven())
    }

    /// Replay a selection, generate its moves, and let the solver try
    /// to prove it; unproven leaves are queued for evaluation.
    fn prepare_leaf(&mut self, board: &Board, to_move: Sign, selection: Selection) -> LeafState {
        self.calc.set_board(board, to_move);
        let mut leaf_board = board.clone();
        for mv in &selection.moves {
            self.calc.add_move(*mv);
            leaf_board.put(*mv).expect("selection replay on a legal path");
        }
        let key = (self.calc.hash(), self.calc.stone_count() as u32);
        let leaf_to_move = self.calc.sign_to_move();

        // transposition: the position was already expanded through a
        // different parent; link it instead of rebuilding the node
        if let Some(node) = self.tree.node(key) {
            let (value, proven) = (node.proven.to_value().unwrap_or(node.value), node.proven);
            self.tree.link(&selection, key);
            self.tree.backup(&selection, value, proven);
            return LeafState::Solved;
        }

        let mut actions = ActionList::new();
        let static_score = self.movegen.generate(&mut self.calc, &mut actions, GeneratorMode::Optimal);
        let solved = if static_score.is_proven() { static_score } else { self.tss.solve(&mut self.calc) };

        if solved.is_proven() {
            let proven = ProvenValue::from_score(solved);
            let value = proven.to_value().expect("proven score maps to exact value");
            let mut node = Node::new(key, leaf_to_move, value, self.edges_from(&actions, None));
            node.proven = proven;
            trace!(%solved, depth = selection.path.len(), "leaf proven by tss");
            self.tree.insert(&selection, node);
            self.tree.backup(&selection, value, proven);
            LeafState::Solved
        } else {
            LeafState::NeedsEvaluation(PendingLeaf {
                selection,
                key,
                to_move: leaf_to_move,
                actions,
                board: leaf_board,
            })
        }
    }

    /// Write evaluator output into a new node and back it up.
    fn finish_leaf(&mut self, leaf: PendingLeaf, output: EvalOutput) {
        let node = Node::new(
            leaf.key,
            leaf.to_move,
            output.value,
            self.edges_from(&leaf.actions, Some(&output.policy)),
        );
        self.tree.insert(&leaf.selection, node);
        self.tree.backup(&leaf.selection, output.value, ProvenValue::Unknown);
    }

    /// Edges for an action list; priors come from the policy when one
    /// is available, normalised over the listed moves.
    fn edges_from(&self, actions: &ActionList, policy: Option<&[f32]>) -> Vec<Edge> {
        let keep = actions.len().min(self.tree.config().max_children);
        let cols = self.config.columns;
        let mut edges: Vec<Edge> = Vec::with_capacity(keep);
        let mut prior_sum = 0.0f32;
        for action in actions.as_slice().iter().take(keep) {
            let raw = match policy {
                Some(p) => p
                    .get(action.loc.row as usize * cols + action.loc.col as usize)
                    .copied()
                    .unwrap_or(0.0)
                    .max(0.0),
                None => 1.0,
            };
            prior_sum += raw;
            let mut edge = Edge::new(action.loc, raw);
            if action.score.is_proven() {
                // the generator already proved this move's outcome
                edge.proven = ProvenValue::from_score(action.score);
            }
            edges.push(edge);
        }
        if prior_sum > 0.0 {
            for edge in &mut edges {
                edge.prior /= prior_sum;
            }
        } else if !edges.is_empty() {
            let uniform = 1.0 / edges.len() as f32;
            for edge in &mut edges {
                edge.prior = uniform;
            }
        }
        edges
    }

    fn report<F>(&mut self, on_event: &mut F, simulations: u64) -> SearchReport
    where
        F: FnMut(RealtimeEvent),
    {
        let (value, proven) = match self.tree.root_node() {
            Some(root) => (root.proven.to_value().unwrap_or(root.value), root.proven),
            None => (Value::default(), ProvenValue::Unknown),
        };
        let best_move = self.tree.best_move(&EdgeSelector::Lcb);
        if let Some(best) = best_move {
            if proven == ProvenValue::Loss {
                on_event(RealtimeEvent::Lose(best));
            }
            on_event(RealtimeEvent::Best(best));
        }
        let report = SearchReport {
            best_move,
            pv: self.tree.principal_variation(),
            value,
            proven,
            simulations,
            root_visits: self.tree.root_node().map_or(0, |n| n.visits),
            node_count: self.tree.node_count(),
        };
        debug!(
            simulations,
            nodes = report.node_count,
            best = ?report.best_move,
            proven = ?report.proven,
            "search finished"
        );
        report
    }
}

enum LeafState {
    Solved,
    NeedsEvaluation(PendingLeaf),
}

impl std::fmt::Debug for SearchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDriver")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::UniformEvaluator;
    use renza_core::GameRules;
    use std::sync::atomic::AtomicBool;

    fn driver(rows: usize, cols: usize, rules: GameRules, max_nodes: u64) -> SearchDriver {
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

    fn infinite_control() -> SearchControl {
        SearchControl::infinite(Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn empty_board_search_returns_legal_move() {
        let mut driver = driver(9, 9, GameRules::Freestyle, 200);
        let board = Board::square(9).unwrap();
        let report = driver.search(&board, Sign::Cross, &infinite_control(), |_| {});
        let best = report.best_move.expect("search must pick a move");
        assert!(board.is_empty_at(best));
        assert!(!report.pv.is_empty());
        assert_eq!(report.pv[0], best);
        assert!(report.simulations > 0);
    }

    #[test]
    fn immediate_win_is_found_and_proven() {
        let mut driver = driver(9, 9, GameRules::Freestyle, 100);
        let board = Board::from_rows(&[
            "X X X X ! _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ O O O _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
            "_ _ _ _ _ _ _ _ _",
        ])
        .unwrap();
        let report = driver.search(&board, Sign::Cross, &infinite_control(), |_| {});
        assert_eq!(report.proven, ProvenValue::Win);
        assert_eq!(report.best_move, Some(Loc::new(0, 4)));
        assert!(report.simulations <= 3, "a proven root needs no rollouts");
    }

    #[test]
    fn realtime_preamble_precedes_best() {
        let mut driver = driver(9, 9, GameRules::Freestyle, 50);
        let board = Board::square(9).unwrap();
        let mut events = Vec::new();
        let _ = driver.search(&board, Sign::Cross, &infinite_control(), |e| events.push(e));
        assert_eq!(events.first(), Some(&RealtimeEvent::Refresh));
        let best_pos = events.iter().position(|e| matches!(e, RealtimeEvent::Best(_)));
        let done_pos = events.iter().position(|e| matches!(e, RealtimeEvent::Done(_)));
        if let (Some(best), Some(done)) = (best_pos, done_pos) {
            assert!(done < best, "DONE preamble must precede BEST");
        }
    }

    #[test]
    fn simulation_cap_is_respected() {
        let mut driver = driver(9, 9, GameRules::Freestyle, 64);
        let board = Board::square(9).unwrap();
        let report = driver.search(&board, Sign::Cross, &infinite_control(), |_| {});
        assert!(report.simulations <= 64);
    }

    #[test]
    fn reset_clears_tree() {
        let mut driver = driver(9, 9, GameRules::Freestyle, 32);
        let board = Board::square(9).unwrap();
        let _ = driver.search(&board, Sign::Cross, &infinite_control(), |_| {});
        assert!(driver.tree.node_count() > 0);
        driver.reset();
        assert_eq!(driver.tree.node_count(), 0);
    }
}
