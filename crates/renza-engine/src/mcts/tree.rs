//! The search tree: selection walks, expansion, and backup over the
//! node cache.

use rand::Rng;

use renza_core::{Loc, Move};

use crate::mcts::cache::NodeCache;
use crate::mcts::node::{Edge, Node, NodeKey};
use crate::mcts::select::{apply_dirichlet_noise, EdgeSelector};
use crate::mcts::value::{ProvenValue, Value};

/// Tuning knobs for the tree and its selection policies.
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub exploration: f32,
    pub noise_weight: f32,
    pub noise_alpha: f32,
    /// Cap on children kept per node.
    pub max_children: usize,
    /// Cap on cached nodes, derived from the memory budget.
    pub node_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> TreeConfig {
        TreeConfig {
            exploration: 1.25,
            noise_weight: 0.25,
            noise_alpha: 0.3,
            max_children: 64,
            node_capacity: 1 << 20,
        }
    }
}

/// Outcome of one selection walk.
#[derive(Debug)]
pub struct Selection {
    /// Visited `(node, edge index)` pairs from the root downwards.
    pub path: Vec<(NodeKey, usize)>,
    /// The moves along the path, for replaying on a calculator.
    pub moves: Vec<Move>,
    /// An existing node the walk ended on (terminal or proven);
    /// `None` when the walk fell off an unexpanded edge or the root
    /// itself is missing.
    pub leaf: Option<NodeKey>,
}

impl Selection {
    /// Whether the driver must create a node for this walk.
    pub fn needs_expansion(&self) -> bool {
        self.leaf.is_none()
    }
}

/// Search tree over a [`NodeCache`].
pub struct Tree {
    cache: NodeCache,
    root: Option<NodeKey>,
    config: TreeConfig,
}

impl Tree {
    pub fn new(config: TreeConfig) -> Tree {
        Tree { cache: NodeCache::new(config.node_capacity), root: None, config }
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub fn root_key(&self) -> Option<NodeKey> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.and_then(|key| self.cache.get(key))
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.cache.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.cache.len()
    }

    /// Move the root; nodes that can no longer be reached are pruned.
    pub fn set_root(&mut self, key: NodeKey) {
        self.root = Some(key);
        self.cache.prune_below_depth(key.1);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.root = None;
    }

    /// Walk from the root applying virtual loss until reaching an
    /// unexpanded edge, a terminal node, or a proven node.
    pub fn select(&mut self, selector: &EdgeSelector) -> Selection {
        let mut path = Vec::new();
        let mut moves = Vec::new();

        let Some(root) = self.root else {
            return Selection { path, moves, leaf: None };
        };
        if !self.cache.contains(root) {
            return Selection { path, moves, leaf: None };
        }

        let mut current = root;
        loop {
            let (edge_index, mv, child) = {
                let node = self.cache.get_mut(current).expect("walk reached evicted node");
                if node.proven.is_proven() || node.edges.is_empty() {
                    return Selection { path, moves, leaf: Some(current) };
                }
                let edge_index = selector.select(node).expect("non-empty node must select");
                let edge = &mut node.edges[edge_index];
                edge.virtual_loss += 1;
                (edge_index, Move::new(node.sign_to_move, edge.loc), edge.child)
            };
            path.push((current, edge_index));
            moves.push(mv);

            match child {
                Some(key) if self.cache.contains(key) => current = key,
                _ => return Selection { path, moves, leaf: None },
            }
        }
    }

    /// Insert a freshly evaluated node and hook it to the pending edge
    /// of its selection path.
    pub fn insert(&mut self, selection: &Selection, node: Node) {
        let key = node.key;
        let protect = self.root.unwrap_or(key);
        self.cache.insert(node, protect);
        if let Some(&(parent, edge_index)) = selection.path.last()
            && let Some(parent_node) = self.cache.get_mut(parent)
        {
            parent_node.edges[edge_index].child = Some(key);
        }
        if self.root.is_none() {
            self.root = Some(key);
        }
    }

    /// Hook an already-cached node to the pending edge of a walk
    /// (transposition reached through a new parent).
    pub fn link(&mut self, selection: &Selection, key: NodeKey) {
        if let Some(&(parent, edge_index)) = selection.path.last()
            && let Some(parent_node) = self.cache.get_mut(parent)
        {
            parent_node.edges[edge_index].child = Some(key);
        }
    }

    /// Remove the virtual loss applied by an abandoned selection walk
    /// that will never be backed up.
    pub fn cancel_virtual_loss(&mut self, selection: &Selection) {
        for &(key, edge_index) in &selection.path {
            if let Some(node) = self.cache.get_mut(key) {
                let edge = &mut node.edges[edge_index];
                edge.virtual_loss = edge.virtual_loss.saturating_sub(1);
            }
        }
    }

    /// Back a leaf result up the path: cancel virtual loss, accumulate
    /// values (flipped each ply), and propagate proofs by the min/max
    /// rule.
    pub fn backup(&mut self, selection: &Selection, leaf_value: Value, leaf_proven: ProvenValue) {
        let mut child_value = leaf_value;
        let mut child_proven = leaf_proven;

        for &(key, edge_index) in selection.path.iter().rev() {
            let parent_value = child_value.inverted();
            let Some(node) = self.cache.get_mut(key) else {
                // ancestor evicted mid-walk; nothing left to update
                return;
            };
            let edge = &mut node.edges[edge_index];
            edge.virtual_loss = edge.virtual_loss.saturating_sub(1);
            edge.visits += 1;
            edge.value_sum += parent_value.expectation();
            if child_proven.is_proven() && edge.proven == ProvenValue::Unknown {
                edge.proven = child_proven.inverted();
            }
            node.visits += 1;
            node.recompute_proven();

            child_proven = node.proven;
            child_value = node.proven.to_value().unwrap_or(parent_value);
        }
    }

    /// Mix Dirichlet noise into the root priors (self-play
    /// exploration; used with the noisy-PUCT selector).
    pub fn apply_root_noise<R: Rng>(&mut self, rng: &mut R) {
        let weight = self.config.noise_weight;
        let alpha = self.config.noise_alpha;
        if let Some(root) = self.root
            && let Some(node) = self.cache.get_mut(root)
        {
            apply_dirichlet_noise(node, rng, weight, alpha);
        }
    }

    /// Principal variation: most-visited edges from the root.
    pub fn principal_variation(&self) -> Vec<Loc> {
        let mut pv = Vec::new();
        let Some(mut key) = self.root else { return pv };
        loop {
            let Some(node) = self.cache.get(key) else { break };
            let Some(edge_index) = node.most_visited_edge() else { break };
            let edge = &node.edges[edge_index];
            if edge.visits == 0 {
                break;
            }
            pv.push(edge.loc);
            match edge.child {
                Some(child) if self.cache.contains(child) => key = child,
                _ => break,
            }
        }
        pv
    }

    /// Best root move under the given committing selector.
    pub fn best_move(&self, selector: &EdgeSelector) -> Option<Loc> {
        let node = self.root_node()?;
        let edge_index = selector.select(node)?;
        Some(node.edges[edge_index].loc)
    }

    /// Initiative-aware mixed value used for policy targets.
    ///
    /// With `sum_v = Σ e.value·e.visits`, `sum_q = Σ e.prior·q(e)`,
    /// `sum_p = Σ e.prior` (visited edges), `N = Σ e.visits`:
    /// `V_mix = (v − sum_v/N) + (1 − 1/N)/sum_p · sum_q`.
    pub fn v_mix(&self, key: NodeKey) -> Option<f32> {
        let node = self.cache.get(key)?;
        let n: u32 = node.edges.iter().map(|e| e.visits).sum();
        if n == 0 {
            return Some(node.value.expectation());
        }
        let sum_v: f32 = node.edges.iter().map(|e| e.value_sum).sum();
        let mut sum_p = 0.0f32;
        let mut sum_q = 0.0f32;
        for edge in node.edges.iter().filter(|e| e.visits > 0) {
            sum_p += edge.prior;
            sum_q += edge.prior * edge.mean_value();
        }
        if sum_p <= 0.0 {
            return Some(node.value.expectation());
        }
        let n = n as f32;
        Some((node.value.expectation() - sum_v / n) + (1.0 - 1.0 / n) / sum_p * sum_q)
    }

    /// Debug check of the visit-sum invariant for one node.
    #[cfg(test)]
    fn check_visit_invariant(&self, key: NodeKey) -> bool {
        match self.cache.get(key) {
            Some(node) if !node.edges.is_empty() => {
                node.edge_visit_sum() == node.visits as u64 - 1
            }
            _ => true,
        }
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renza_core::Sign;

    const SELECTOR: EdgeSelector = EdgeSelector::Puct { exploration: 1.5 };

    fn leaf_edges(count: u8) -> Vec<Edge> {
        (0..count)
            .map(|i| Edge::new(Loc::new(1, i), 1.0 / count as f32))
            .collect()
    }

    /// Drive one simulation by hand: select, then expand a dummy node
    /// at the pending edge, then back up `value`.
    fn simulate(tree: &mut Tree, hash: u64, value: Value, proven: ProvenValue) {
        let selection = tree.select(&SELECTOR);
        if selection.needs_expansion() {
            let depth = selection.path.len() as u32;
            let sign = if depth % 2 == 0 { Sign::Cross } else { Sign::Circle };
            let mut node = Node::new((hash, depth), sign, value, leaf_edges(3));
            node.proven = proven;
            tree.insert(&selection, node);
            tree.backup(&selection, value, proven);
        } else {
            let leaf = selection.leaf.unwrap();
            let node_value = tree.node(leaf).unwrap().value;
            let node_proven = tree.node(leaf).unwrap().proven;
            tree.backup(&selection, node_value, node_proven);
        }
    }

    #[test]
    fn first_selection_requests_root_expansion() {
        let mut tree = Tree::new(TreeConfig::default());
        let selection = tree.select(&SELECTOR);
        assert!(selection.needs_expansion());
        assert!(selection.path.is_empty());
    }

    #[test]
    fn visit_sums_hold_after_simulations() {
        let mut tree = Tree::new(TreeConfig::default());
        for i in 0..40u64 {
            simulate(&mut tree, 1000 + i, Value::new(0.6, 0.2, 0.2), ProvenValue::Unknown);
        }
        let root = tree.root_key().unwrap();
        assert!(tree.check_visit_invariant(root));
        let root_node = tree.root_node().unwrap();
        for edge in root_node.edges.iter() {
            assert_eq!(edge.virtual_loss, 0, "virtual loss must cancel after backup");
            if let Some(child) = edge.child {
                assert!(tree.check_visit_invariant(child));
            }
        }
        assert_eq!(root_node.visits as u64, 40);
    }

    #[test]
    fn proven_win_child_proves_parent_loss_edge() {
        let mut tree = Tree::new(TreeConfig::default());
        simulate(&mut tree, 1, Value::default(), ProvenValue::Unknown);
        // next expansion lands below the root; claim it is a win for
        // the child side to move
        simulate(&mut tree, 2, Value::WIN, ProvenValue::Win);

        let root = tree.root_node().unwrap();
        let proven_edges: Vec<_> =
            root.edges.iter().filter(|e| e.proven == ProvenValue::Loss).collect();
        assert_eq!(proven_edges.len(), 1, "the winning child marks its edge as lost");
    }

    #[test]
    fn all_losing_children_prove_parent_win() {
        let mut tree = Tree::new(TreeConfig::default());
        simulate(&mut tree, 1, Value::default(), ProvenValue::Unknown);
        // every child claims "the side to move here loses"
        for i in 0..3u64 {
            simulate(&mut tree, 10 + i, Value::LOSS, ProvenValue::Loss);
        }
        let root = tree.root_node().unwrap();
        assert_eq!(root.proven, ProvenValue::Win, "all children lost, root wins");
    }

    #[test]
    fn pv_follows_most_visited() {
        let mut tree = Tree::new(TreeConfig::default());
        for i in 0..30u64 {
            simulate(&mut tree, 500 + i, Value::new(0.5, 0.3, 0.2), ProvenValue::Unknown);
        }
        let pv = tree.principal_variation();
        assert!(!pv.is_empty());
        let root = tree.root_node().unwrap();
        let best = root.most_visited_edge().unwrap();
        assert_eq!(pv[0], root.edges[best].loc);
    }

    #[test]
    fn set_root_prunes_stale_depths() {
        let mut tree = Tree::new(TreeConfig::default());
        simulate(&mut tree, 1, Value::default(), ProvenValue::Unknown);
        simulate(&mut tree, 2, Value::default(), ProvenValue::Unknown);
        let deep_key = (2u64, 1u32);
        assert!(tree.node(deep_key).is_some());
        tree.set_root(deep_key);
        assert!(tree.node((1, 0)).is_none(), "old root must be pruned");
        assert!(tree.node(deep_key).is_some());
    }

    #[test]
    fn v_mix_matches_definition() {
        let mut tree = Tree::new(TreeConfig::default());
        for i in 0..20u64 {
            simulate(&mut tree, 700 + i, Value::new(0.55, 0.1, 0.35), ProvenValue::Unknown);
        }
        let root_key = tree.root_key().unwrap();
        let node = tree.root_node().unwrap();
        let n: u32 = node.edges.iter().map(|e| e.visits).sum();
        let sum_v: f32 = node.edges.iter().map(|e| e.value_sum).sum();
        let mut sum_p = 0.0f32;
        let mut sum_q = 0.0f32;
        for e in node.edges.iter().filter(|e| e.visits > 0) {
            sum_p += e.prior;
            sum_q += e.prior * e.mean_value();
        }
        let expected = (node.value.expectation() - sum_v / n as f32)
            + (1.0 - 1.0 / n as f32) / sum_p * sum_q;
        let got = tree.v_mix(root_key).unwrap();
        assert!((got - expected).abs() < 1e-5);
    }

    #[test]
    fn v_mix_of_unvisited_node_is_raw_value() {
        let mut tree = Tree::new(TreeConfig::default());
        let value = Value::new(0.3, 0.4, 0.3);
        simulate(&mut tree, 1, value, ProvenValue::Unknown);
        let got = tree.v_mix(tree.root_key().unwrap()).unwrap();
        assert!((got - value.expectation()).abs() < 1e-6);
    }
}
