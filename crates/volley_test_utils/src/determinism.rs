//! Determinism testing utilities.
//!
//! The predicted-actor core must be 100% deterministic: a rolled-back
//! tick is re-run with the same inputs and must reproduce the same
//! state, and the predicting peer must converge with the authoritative
//! peer. Sources of non-determinism this harness guards against:
//!
//! - **Floating-point math**: different CPUs can produce different
//!   results. The core uses fixed-point throughout.
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The core always iterates in sorted entity ID order.
//! - **System randomness**: none; spawners use deterministic sequences.

use std::thread;

use volley_core::simulation::Simulation;

use crate::arena::Arena;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic core).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and compare final state hashes.
///
/// `setup` builds a fresh simulation and world from scratch for each
/// run; the harness then advances `ticks` ticks and hashes the result.
pub fn run_repeated<F>(runs: usize, ticks: u64, setup: F) -> DeterminismResult
where
    F: Fn() -> (Simulation, Arena),
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let (mut sim, mut world) = setup();
        for _ in 0..ticks {
            sim.tick(&mut world);
        }
        hashes.push(sim.state_hash());
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a scenario on multiple threads in parallel and compare hashes.
///
/// Catches non-determinism that only shows up under scheduler pressure
/// (there should be none: each simulation is single-threaded and owns
/// its state).
pub fn run_parallel<F>(runs: usize, ticks: u64, setup: F) -> DeterminismResult
where
    F: Fn() -> (Simulation, Arena) + Send + Sync,
{
    let hashes: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                scope.spawn(|| {
                    let (mut sim, mut world) = setup();
                    for _ in 0..ticks {
                        sim.tick(&mut world);
                    }
                    sim.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("simulation thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{standard_shot_scenario, straight_shot};
    use volley_core::simulation::{Authority, Simulation};

    #[test]
    fn test_repeated_runs_match() {
        let result = run_repeated(4, 120, standard_shot_scenario);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_parallel_runs_match() {
        let result = run_parallel(4, 120, standard_shot_scenario);
        result.assert_deterministic();
    }

    #[test]
    fn test_divergent_setups_are_caught() {
        // Sanity-check the harness itself: different scenarios hash
        // differently.
        let a = run_repeated(1, 10, standard_shot_scenario);
        let b = run_repeated(1, 10, || {
            let mut sim = Simulation::new(Authority::Server);
            sim.fire(straight_shot(2)).unwrap();
            (sim, Arena::new())
        });
        assert_ne!(a.hashes[0], b.hashes[0]);
    }
}
