//! Search control: stop flag, time budget, and simulation caps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Controls when a running search must stop.
///
/// Checked between simulations — never mid-recursion inside the
/// solver or mid-traversal inside the tree.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    time_limit: Option<Duration>,
    max_simulations: Option<u64>,
}

impl SearchControl {
    /// No limits; only the external stop flag ends the search.
    pub fn infinite(stopped: Arc<AtomicBool>) -> SearchControl {
        SearchControl { stopped, start: Instant::now(), time_limit: None, max_simulations: None }
    }

    /// Time- and/or simulation-bounded search.
    pub fn bounded(
        stopped: Arc<AtomicBool>,
        time_limit: Option<Duration>,
        max_simulations: Option<u64>,
    ) -> SearchControl {
        SearchControl { stopped, start: Instant::now(), time_limit, max_simulations }
    }

    /// Whether the search should exit at its next safe point.
    pub fn should_stop(&self, simulations: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(cap) = self.max_simulations
            && simulations >= cap
        {
            return true;
        }
        if let Some(limit) = self.time_limit
            && self.start.elapsed() >= limit
        {
            self.stopped.store(true, Ordering::Release);
            return true;
        }
        false
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

impl std::fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchControl")
            .field("time_limit", &self.time_limit)
            .field("max_simulations", &self.max_simulations)
            .finish()
    }
}
