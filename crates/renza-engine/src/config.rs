//! Engine-wide configuration assembled from protocol options.

use renza_core::GameRules;

use crate::tss::MIN_HASH_MB;

/// Rough per-node footprint used to convert a memory budget into a
/// node-cache capacity.
const BYTES_PER_NODE: usize = 2048;

/// All options the engine recognises; protocol `INFO` lines and the
/// defaults below are the only sources.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rows: usize,
    pub columns: usize,
    pub rules: GameRules,
    /// Maximum selection depth per simulation.
    pub max_depth: usize,
    /// Simulation cap per search; 0 means unlimited.
    pub max_nodes: u64,
    /// Per-move time budget in milliseconds; 0 means untimed.
    pub time_increment_ms: u64,
    pub auto_pondering: bool,
    /// Memory budget in bytes for the node cache.
    pub max_memory: usize,
    pub thread_num: usize,
    pub use_database: bool,
    /// Threat-space hash table size in megabytes.
    pub hash_size_mb: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            rows: 15,
            columns: 15,
            rules: GameRules::Freestyle,
            max_depth: 64,
            max_nodes: 10_000,
            time_increment_ms: 0,
            auto_pondering: false,
            max_memory: 256 * 1024 * 1024,
            thread_num: 1,
            use_database: false,
            hash_size_mb: 64,
        }
    }
}

impl EngineConfig {
    /// Node-cache capacity implied by the memory budget.
    pub fn node_capacity(&self) -> usize {
        (self.max_memory / BYTES_PER_NODE).max(1024)
    }

    /// Clamp and store the hash size; returns the accepted value and
    /// whether clamping occurred so the protocol can report it.
    pub fn set_hash_size_mb(&mut self, mb: usize) -> (usize, bool) {
        let clamped = mb.max(MIN_HASH_MB);
        self.hash_size_mb = clamped;
        (clamped, clamped != mb)
    }

    /// Cap the worker count at the machine's parallelism.
    pub fn set_thread_num(&mut self, threads: usize) -> usize {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        self.thread_num = threads.clamp(1, cores);
        self.thread_num
    }

    pub fn set_board_size(&mut self, rows: usize, columns: usize) {
        self.rows = rows;
        self.columns = columns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.rows, 15);
        assert!(config.node_capacity() > 1024);
    }

    #[test]
    fn hash_size_clamps_to_minimum() {
        let mut config = EngineConfig::default();
        let (accepted, clamped) = config.set_hash_size_mb(2);
        assert_eq!(accepted, MIN_HASH_MB);
        assert!(clamped);
        let (accepted, clamped) = config.set_hash_size_mb(128);
        assert_eq!(accepted, 128);
        assert!(!clamped);
    }

    #[test]
    fn thread_num_clamps_to_cores() {
        let mut config = EngineConfig::default();
        assert!(config.set_thread_num(0) >= 1);
        let huge = config.set_thread_num(10_000);
        assert!(huge <= std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    }
}
