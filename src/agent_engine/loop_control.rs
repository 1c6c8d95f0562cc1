use std::time::{Duration, Instant};

/// Iteration budget for the autonomous test loop.
pub struct LoopController {
    max_iterations: u32,
    iterations: u32,
    failures: u32,
    start_time: Instant,
}

impl LoopController {
    /// A budget of zero still allows one iteration.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            iterations: 0,
            failures: 0,
            start_time: Instant::now(),
        }
    }

    /// Counts a new iteration and returns its 1-based number.
    pub fn begin_iteration(&mut self) -> u32 {
        self.iterations += 1;
        self.iterations
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn exhausted(&self) -> bool {
        self.iterations >= self.max_iterations
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_iterations() {
        let mut ctl = LoopController::new(2);
        assert_eq!(ctl.begin_iteration(), 1);
        assert!(!ctl.exhausted());
        assert_eq!(ctl.begin_iteration(), 2);
        assert!(ctl.exhausted());
    }

    #[test]
    fn zero_budget_allows_one_turn() {
        let mut ctl = LoopController::new(0);
        assert_eq!(ctl.max_iterations(), 1);
        ctl.begin_iteration();
        assert!(ctl.exhausted());
    }
}
