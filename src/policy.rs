//! `BanditPolicy`: the index-based interface the experiment driver runs.
//!
//! Arms are positions in the allocation list; a policy never sees what an
//! arm represents. [`GptsLearner`][crate::GptsLearner] is the policy this
//! crate ships; the driver is generic so other index policies can be compared
//! under the same harness.

use crate::{PosteriorSnapshot, Result};

/// Common interface for stateful policies over a fixed number of indexed arms.
///
/// # Example
///
/// ```rust
/// use gpts_alloc::{BanditPolicy, GpConfig, GptsLearner};
///
/// fn run_policy<P: BanditPolicy>(policy: &mut P, rounds: usize) {
///     for _ in 0..rounds {
///         let arm = policy.pull_arm();
///         // ... probe the environment ...
///         policy.update(arm, 1.0).unwrap();
///     }
/// }
///
/// let mut gpts = GptsLearner::with_seed(5, GpConfig::default(), 0).unwrap();
/// run_policy(&mut gpts, 3);
/// ```
pub trait BanditPolicy {
    /// Number of arms (fixed for the policy's lifetime).
    fn n_arms(&self) -> usize;

    /// Choose the next arm to probe.
    fn pull_arm(&mut self) -> usize;

    /// Feed back the reward observed for `arm`.
    fn update(&mut self, arm: usize, reward: f64) -> Result<()>;

    /// Current estimate of each arm's expected reward.
    fn means(&self) -> &[f64];

    /// Arm the policy currently believes is best (first on ties).
    fn best_arm(&self) -> usize {
        crate::utils::argmax_first(self.means()).unwrap_or(0)
    }

    /// Posterior snapshot for diagnostics, if the policy has one.
    fn snapshot(&self) -> Option<PosteriorSnapshot> {
        None
    }

    /// Updates whose model refit was skipped.
    fn fit_failures(&self) -> u64 {
        0
    }
}

impl BanditPolicy for crate::GptsLearner {
    fn n_arms(&self) -> usize {
        self.n_arms()
    }
    fn pull_arm(&mut self) -> usize {
        self.pull_arm()
    }
    fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        self.update(arm, reward)
    }
    fn means(&self) -> &[f64] {
        self.means()
    }
    fn best_arm(&self) -> usize {
        self.best_arm()
    }
    fn snapshot(&self) -> Option<PosteriorSnapshot> {
        Some(self.posterior_snapshot())
    }
    fn fit_failures(&self) -> u64 {
        self.fit_failures()
    }
}
