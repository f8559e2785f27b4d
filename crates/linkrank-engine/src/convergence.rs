//! Convergence monitor
//!
//! The "still changing" signal is a round-scoped counter. Reduce calls return
//! their increments and the substrate folds them after the barrier; nothing
//! here is shared between workers.

use crate::substrate::Counters;
use crate::CONVERGENCE_THRESHOLD;

/// Counter name for vertices whose rank moved more than the threshold
pub const CONVERGENCE_COUNTER: &str = "convergence";

/// Strictly greater than the threshold counts as a change
pub fn has_changed(old_rank: f64, new_rank: f64) -> bool {
    (new_rank - old_rank).abs() > CONVERGENCE_THRESHOLD
}

/// Reads the round's changed count out of the folded counters
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceMonitor;

impl ConvergenceMonitor {
    /// Counter delta for one aggregated vertex
    pub fn observe(&self, old_rank: f64, new_rank: f64) -> Counters {
        let mut counters = Counters::new();
        if has_changed(old_rank, new_rank) {
            counters.increment(CONVERGENCE_COUNTER, 1);
        }
        counters
    }

    pub fn changed_count(&self, counters: &Counters) -> u64 {
        counters.get(CONVERGENCE_COUNTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!has_changed(1.0, 1.0));
        assert!(!has_changed(1.0, 1.0005));
        assert!(has_changed(1.0, 1.0011));
        assert!(has_changed(1.0, 0.15));
    }

    #[test]
    fn test_observe_folds_into_changed_count() {
        let monitor = ConvergenceMonitor;
        let mut total = Counters::new();
        total.merge(monitor.observe(1.0, 0.8725));
        total.merge(monitor.observe(0.15, 0.15));
        total.merge(monitor.observe(1.0, 0.15));

        assert_eq!(monitor.changed_count(&total), 2);
    }

    #[test]
    fn test_unchanged_vertex_adds_no_counter() {
        let monitor = ConvergenceMonitor;
        assert!(monitor.observe(0.15, 0.15).is_empty());
        assert!(!monitor.observe(1.0, 0.15).is_empty());
    }
}
