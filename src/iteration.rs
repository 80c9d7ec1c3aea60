//! Iteration counting for the capped correction loops.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::IterationLimits;
use crate::phase::Phase;

/// Tracks validation attempts per phase and compares them against configured
/// limits.
///
/// Counts are monotonically increasing for the lifetime of a session; a new
/// session starts from zero. Phases without a cap are still counted so
/// escalation payloads can report how often they were attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IterationTracker {
    counts: HashMap<Phase, u32>,
}

impl IterationTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt for a phase and return the new count.
    pub fn increment(&mut self, phase: Phase) -> u32 {
        let count = self.counts.entry(phase).or_insert(0);
        *count += 1;
        *count
    }

    /// Attempts recorded for a phase so far.
    pub fn count(&self, phase: Phase) -> u32 {
        self.counts.get(&phase).copied().unwrap_or(0)
    }

    /// Whether a phase has used up its configured cap.
    ///
    /// Always false for uncapped phases, no matter how many attempts were
    /// recorded.
    pub fn has_reached_limit(&self, phase: Phase, limits: &IterationLimits) -> bool {
        match limits.limit_for(phase) {
            Some(limit) => self.count(phase) >= limit,
            None => false,
        }
    }

    /// Attempts left before the cap, or `None` for uncapped phases.
    pub fn remaining(&self, phase: Phase, limits: &IterationLimits) -> Option<u32> {
        limits
            .limit_for(phase)
            .map(|limit| limit.saturating_sub(self.count(phase)))
    }

    /// True if no attempts have been recorded at all.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_start_at_zero() {
        let tracker = IterationTracker::new();
        assert_eq!(tracker.count(Phase::Test), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn increment_returns_the_new_count() {
        let mut tracker = IterationTracker::new();
        assert_eq!(tracker.increment(Phase::Test), 1);
        assert_eq!(tracker.increment(Phase::Test), 2);
        assert_eq!(tracker.count(Phase::Test), 2);
        assert_eq!(tracker.count(Phase::Lint), 0);
    }

    #[test]
    fn counts_are_independent_per_phase() {
        let mut tracker = IterationTracker::new();
        tracker.increment(Phase::Test);
        tracker.increment(Phase::Lint);
        tracker.increment(Phase::Lint);
        assert_eq!(tracker.count(Phase::Test), 1);
        assert_eq!(tracker.count(Phase::Lint), 2);
    }

    #[test]
    fn limit_is_reached_at_exactly_the_cap() {
        let limits = IterationLimits {
            test: 2,
            lint: 3,
            iterate: 5,
        };
        let mut tracker = IterationTracker::new();
        tracker.increment(Phase::Test);
        assert!(!tracker.has_reached_limit(Phase::Test, &limits));
        tracker.increment(Phase::Test);
        assert!(tracker.has_reached_limit(Phase::Test, &limits));
        tracker.increment(Phase::Test);
        assert!(tracker.has_reached_limit(Phase::Test, &limits));
    }

    #[test]
    fn uncapped_phases_never_reach_a_limit() {
        let limits = IterationLimits::default();
        let mut tracker = IterationTracker::new();
        for _ in 0..20 {
            tracker.increment(Phase::WriteOrRefactor);
        }
        assert!(!tracker.has_reached_limit(Phase::WriteOrRefactor, &limits));
        assert_eq!(tracker.remaining(Phase::WriteOrRefactor, &limits), None);
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let limits = IterationLimits {
            test: 1,
            lint: 3,
            iterate: 5,
        };
        let mut tracker = IterationTracker::new();
        tracker.increment(Phase::Test);
        tracker.increment(Phase::Test);
        assert_eq!(tracker.remaining(Phase::Test, &limits), Some(0));
    }
}
