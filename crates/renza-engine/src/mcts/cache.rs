//! The node cache: owner of every tree node.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::mcts::node::{Node, NodeKey};

/// Hash-indexed store of nodes with a hard size cap.
///
/// Nodes are owned here and nowhere else; edges refer to children by
/// [`NodeKey`] and validate the reference on every dereference, so
/// eviction never leaves a dangling pointer, only a cache miss that
/// reads as "unexpanded".
pub struct NodeCache {
    map: HashMap<NodeKey, Node>,
    /// Insertion order; eviction removes the oldest entries first.
    order: VecDeque<NodeKey>,
    capacity: usize,
}

impl NodeCache {
    pub fn new(capacity: usize) -> NodeCache {
        NodeCache { map: HashMap::new(), order: VecDeque::new(), capacity: capacity.max(64) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.map.contains_key(&key)
    }

    #[inline]
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.map.get(&key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.map.get_mut(&key)
    }

    /// Insert a node, evicting the oldest entries (never `protect`)
    /// while over capacity.
    pub fn insert(&mut self, node: Node, protect: NodeKey) {
        let key = node.key;
        if self.map.insert(key, node).is_none() {
            self.order.push_back(key);
        }
        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else { break };
            if oldest == protect || oldest == key {
                self.order.push_back(oldest);
                // every remaining entry is protected; give up
                if self.order.len() <= 2 {
                    break;
                }
                continue;
            }
            self.map.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Drop every node above the new root: their move-count depth is
    /// smaller, so no path from the root can reach them again.
    pub fn prune_below_depth(&mut self, root_depth: u32) {
        let before = self.map.len();
        self.map.retain(|key, _| key.1 >= root_depth);
        self.order.retain(|key| key.1 >= root_depth);
        if before != self.map.len() {
            debug!(pruned = before - self.map.len(), kept = self.map.len(), "node cache pruned");
        }
    }
}

impl std::fmt::Debug for NodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCache")
            .field("nodes", &self.map.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcts::value::Value;
    use renza_core::Sign;

    fn node(hash: u64, depth: u32) -> Node {
        Node::new((hash, depth), Sign::Cross, Value::default(), Vec::new())
    }

    #[test]
    fn insert_and_get() {
        let mut cache = NodeCache::new(100);
        cache.insert(node(42, 3), (42, 3));
        assert!(cache.contains((42, 3)));
        assert!(cache.get((42, 4)).is_none());
    }

    #[test]
    fn prune_removes_shallower_nodes() {
        let mut cache = NodeCache::new(100);
        cache.insert(node(1, 1), (0, 0));
        cache.insert(node(2, 2), (0, 0));
        cache.insert(node(3, 3), (0, 0));
        cache.prune_below_depth(3);
        assert!(!cache.contains((1, 1)));
        assert!(!cache.contains((2, 2)));
        assert!(cache.contains((3, 3)));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut cache = NodeCache::new(64);
        let protect = (0u64, 0u32);
        cache.insert(node(0, 0), protect);
        for i in 1..=70u64 {
            cache.insert(node(i, 1), protect);
        }
        assert!(cache.len() <= 64);
        // the protected root survives, the oldest unprotected do not
        assert!(cache.contains(protect));
        assert!(!cache.contains((1, 1)));
        assert!(cache.contains((70, 1)));
    }
}
