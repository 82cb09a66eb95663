//! Tree nodes and their inline edges.

use renza_core::{Loc, Sign};

use crate::mcts::value::{ProvenValue, Value};

/// Cache identity of a node: Zobrist hash plus the move-count depth.
///
/// The depth component lets the cache drop whole generations of
/// unreachable nodes when the root advances.
pub type NodeKey = (u64, u32);

/// One move out of a node. Edges are owned inline by their parent;
/// `child` is a non-owning reference validated against the cache.
#[derive(Debug, Clone)]
pub struct Edge {
    pub loc: Loc,
    /// Policy prior from the evaluator, normalised over siblings.
    pub prior: f32,
    pub visits: u32,
    /// Sum of backed-up expectations, from the parent's perspective.
    pub value_sum: f32,
    /// Temporary bias steering concurrent selections apart.
    pub virtual_loss: u32,
    /// Proven outcome of playing this edge, parent's perspective.
    pub proven: ProvenValue,
    pub child: Option<NodeKey>,
}

impl Edge {
    pub fn new(loc: Loc, prior: f32) -> Edge {
        Edge {
            loc,
            prior,
            visits: 0,
            value_sum: 0.0,
            virtual_loss: 0,
            proven: ProvenValue::Unknown,
            child: None,
        }
    }

    /// Mean action value including the virtual-loss bias; `fallback`
    /// is used for unvisited edges (first-play urgency).
    pub fn q(&self, fallback: f32) -> f32 {
        match self.proven {
            ProvenValue::Win => return 1.0,
            ProvenValue::Loss => return 0.0,
            ProvenValue::Draw => return 0.5,
            ProvenValue::Unknown => {}
        }
        let n = self.visits + self.virtual_loss;
        if n == 0 {
            fallback
        } else {
            // virtual losses count as losses (value 0)
            self.value_sum / n as f32
        }
    }

    /// Mean value over real visits only.
    pub fn mean_value(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.value_sum / self.visits as f32
        }
    }
}

/// A position in the search tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub key: NodeKey,
    pub sign_to_move: Sign,
    /// Evaluator estimate for the side to move.
    pub value: Value,
    pub visits: u32,
    pub proven: ProvenValue,
    pub edges: Box<[Edge]>,
}

impl Node {
    pub fn new(key: NodeKey, sign_to_move: Sign, value: Value, edges: Vec<Edge>) -> Node {
        Node {
            key,
            sign_to_move,
            value,
            visits: 1,
            proven: ProvenValue::Unknown,
            edges: edges.into_boxed_slice(),
        }
    }

    /// Total visits across edges; `visits - 1` between backups.
    pub fn edge_visit_sum(&self) -> u64 {
        self.edges.iter().map(|e| e.visits as u64).sum()
    }

    /// Index of the most visited edge, breaking ties by value.
    pub fn most_visited_edge(&self) -> Option<usize> {
        (0..self.edges.len()).max_by(|&a, &b| {
            let ea = &self.edges[a];
            let eb = &self.edges[b];
            ea.visits
                .cmp(&eb.visits)
                .then(ea.mean_value().partial_cmp(&eb.mean_value()).unwrap_or(std::cmp::Ordering::Equal))
        })
    }

    /// Re-derive the parent proof from edge proofs: a winning edge
    /// proves the node, all-losing edges prove the loss, and a fully
    /// proven node falls back to its best draw.
    pub fn recompute_proven(&mut self) {
        if self.edges.is_empty() {
            return;
        }
        let mut all_proven = true;
        let mut any_win = false;
        let mut any_draw = false;
        for edge in self.edges.iter() {
            match edge.proven {
                ProvenValue::Win => any_win = true,
                ProvenValue::Draw => any_draw = true,
                ProvenValue::Loss => {}
                ProvenValue::Unknown => all_proven = false,
            }
        }
        self.proven = if any_win {
            ProvenValue::Win
        } else if all_proven {
            if any_draw { ProvenValue::Draw } else { ProvenValue::Loss }
        } else {
            ProvenValue::Unknown
        };
    }
}
