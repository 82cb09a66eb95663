//! Edge selection policies.

use rand::Rng;
use rand_distr::{Dirichlet, Distribution};

use crate::mcts::node::Node;
use crate::mcts::value::ProvenValue;

/// Which edge of a node a tree walk descends next.
#[derive(Debug, Clone, Copy)]
pub enum EdgeSelector {
    /// `Q + c * P * sqrt(sum N) / (1 + N)`.
    Puct {
        exploration: f32,
    },
    /// PUCT with Dirichlet noise mixed into the root priors; the
    /// walk itself behaves like plain PUCT.
    NoisyPuct {
        exploration: f32,
        noise_weight: f32,
        noise_alpha: f32,
    },
    /// Lower confidence bound on Q; used to commit to a best move.
    Lcb,
    /// Plain visit count; used for PV extraction.
    MaxVisit,
}

impl EdgeSelector {
    /// Pick an edge index, or `None` for a childless node.
    pub fn select(&self, node: &Node) -> Option<usize> {
        if node.edges.is_empty() {
            return None;
        }
        match *self {
            EdgeSelector::Puct { exploration }
            | EdgeSelector::NoisyPuct { exploration, .. } => Some(puct(node, exploration)),
            EdgeSelector::Lcb => Some(lcb(node)),
            EdgeSelector::MaxVisit => node.most_visited_edge(),
        }
    }
}

fn puct(node: &Node, exploration: f32) -> usize {
    let parent_visits: u32 = node.edges.iter().map(|e| e.visits + e.virtual_loss).sum();
    let sqrt_total = ((1 + parent_visits) as f32).sqrt();
    let fpu = node.value.expectation();

    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, edge) in node.edges.iter().enumerate() {
        // never descend into a proven loss unless nothing else exists
        let q = edge.q(fpu);
        let u = exploration * edge.prior * sqrt_total / (1 + edge.visits + edge.virtual_loss) as f32;
        let mut score = q + u;
        if edge.proven == ProvenValue::Loss {
            score -= 1_000.0;
        }
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

fn lcb(node: &Node) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, edge) in node.edges.iter().enumerate() {
        let score = match edge.proven {
            ProvenValue::Win => 2.0 + 1.0 / (1.0 + edge.visits as f32),
            ProvenValue::Loss => -2.0,
            _ => {
                if edge.visits == 0 {
                    -1.0
                } else {
                    edge.mean_value() - 1.0 / (edge.visits as f32).sqrt()
                }
            }
        };
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

/// Mix Dirichlet noise into a node's priors for self-play exploration.
pub fn apply_dirichlet_noise<R: Rng>(node: &mut Node, rng: &mut R, weight: f32, alpha: f32) {
    let n = node.edges.len();
    if n < 2 || weight <= 0.0 {
        return;
    }
    let dirichlet = match Dirichlet::new_with_size(alpha as f64, n) {
        Ok(d) => d,
        Err(_) => return,
    };
    let noise = dirichlet.sample(rng);
    for (edge, eta) in node.edges.iter_mut().zip(noise) {
        edge.prior = (1.0 - weight) * edge.prior + weight * eta as f32;
    }
}

/// Sequential-halving schedule over root candidates: the visit budget
/// is split into elimination rounds, each spreading its share evenly
/// over the surviving half of the candidates.
#[derive(Debug)]
pub struct SequentialHalving {
    survivors: Vec<usize>,
    budget: u32,
    round_target: u32,
    cursor: usize,
}

impl SequentialHalving {
    pub fn new(num_edges: usize, budget: u32) -> SequentialHalving {
        let rounds = (num_edges.max(2) as f32).log2().ceil() as u32;
        let round_target = (budget / rounds.max(1)).max(1);
        SequentialHalving {
            survivors: (0..num_edges).collect(),
            budget,
            round_target,
            cursor: 0,
        }
    }

    /// Next root edge to visit, or `None` once the budget is spent.
    pub fn next_edge(&mut self, node: &Node) -> Option<usize> {
        if self.budget == 0 || self.survivors.is_empty() {
            return None;
        }
        self.budget -= 1;

        if self.cursor >= self.round_target as usize * self.survivors.len() {
            self.halve(node);
        }
        let edge = self.survivors[self.cursor % self.survivors.len()];
        self.cursor += 1;
        Some(edge)
    }

    /// Keep the better half of the survivors by mean value.
    fn halve(&mut self, node: &Node) {
        if self.survivors.len() <= 1 {
            return;
        }
        self.survivors.sort_by(|&a, &b| {
            node.edges[b]
                .mean_value()
                .partial_cmp(&node.edges[a].mean_value())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.survivors.truncate((self.survivors.len() + 1) / 2);
        self.cursor = 0;
    }

    pub fn survivors(&self) -> &[usize] {
        &self.survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcts::node::{Edge, Node};
    use crate::mcts::value::Value;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use renza_core::{Loc, Sign};

    fn test_node(priors: &[f32]) -> Node {
        let edges: Vec<Edge> = priors
            .iter()
            .enumerate()
            .map(|(i, &p)| Edge::new(Loc::new(0, i as u8), p))
            .collect();
        Node::new((0, 0), Sign::Cross, Value::default(), edges)
    }

    #[test]
    fn puct_prefers_high_prior_when_unvisited() {
        let node = test_node(&[0.1, 0.7, 0.2]);
        let selector = EdgeSelector::Puct { exploration: 1.5 };
        assert_eq!(selector.select(&node), Some(1));
    }

    #[test]
    fn puct_avoids_proven_losses() {
        let mut node = test_node(&[0.9, 0.1]);
        node.edges[0].proven = ProvenValue::Loss;
        let selector = EdgeSelector::Puct { exploration: 1.5 };
        assert_eq!(selector.select(&node), Some(1));
    }

    #[test]
    fn puct_balances_visits() {
        let mut node = test_node(&[0.5, 0.5]);
        // edge 0 heavily visited with mediocre value
        node.edges[0].visits = 100;
        node.edges[0].value_sum = 50.0;
        let selector = EdgeSelector::Puct { exploration: 1.5 };
        // the unvisited sibling gets the exploration bonus
        assert_eq!(selector.select(&node), Some(1));
    }

    #[test]
    fn lcb_prefers_well_explored_edges() {
        let mut node = test_node(&[0.5, 0.5]);
        node.edges[0].visits = 4;
        node.edges[0].value_sum = 2.4; // mean 0.6, lcb 0.1
        node.edges[1].visits = 400;
        node.edges[1].value_sum = 220.0; // mean 0.55, lcb 0.5
        assert_eq!(EdgeSelector::Lcb.select(&node), Some(1));
    }

    #[test]
    fn lcb_takes_proven_win_immediately() {
        let mut node = test_node(&[0.5, 0.5]);
        node.edges[0].visits = 100;
        node.edges[0].value_sum = 90.0;
        node.edges[1].proven = ProvenValue::Win;
        assert_eq!(EdgeSelector::Lcb.select(&node), Some(1));
    }

    #[test]
    fn max_visit_returns_most_visited() {
        let mut node = test_node(&[0.2, 0.3, 0.5]);
        node.edges[1].visits = 10;
        assert_eq!(EdgeSelector::MaxVisit.select(&node), Some(1));
    }

    #[test]
    fn empty_node_selects_nothing() {
        let node = test_node(&[]);
        assert_eq!(EdgeSelector::MaxVisit.select(&node), None);
        assert_eq!(EdgeSelector::Puct { exploration: 1.0 }.select(&node), None);
    }

    #[test]
    fn dirichlet_noise_keeps_priors_normalised() {
        let mut node = test_node(&[0.25, 0.25, 0.25, 0.25]);
        let mut rng = SmallRng::seed_from_u64(7);
        apply_dirichlet_noise(&mut node, &mut rng, 0.25, 0.3);
        let sum: f32 = node.edges.iter().map(|e| e.prior).sum();
        assert!((sum - 1.0).abs() < 1e-4, "priors sum to {sum}");
        assert!(node.edges.iter().all(|e| e.prior >= 0.0));
    }

    #[test]
    fn sequential_halving_spends_budget_and_narrows() {
        let mut node = test_node(&[0.25, 0.25, 0.25, 0.25]);
        // fake values: edge 2 is best
        for (i, value) in [0.3f32, 0.4, 0.8, 0.1].iter().enumerate() {
            node.edges[i].visits = 1;
            node.edges[i].value_sum = *value;
        }
        let mut sh = SequentialHalving::new(4, 40);
        let mut spent = 0;
        while let Some(edge) = sh.next_edge(&node) {
            assert!(edge < 4);
            spent += 1;
        }
        assert_eq!(spent, 40);
        assert!(sh.survivors().contains(&2), "best edge must survive halving");
    }
}
