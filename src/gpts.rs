//! Gaussian-process Thompson sampling over a finite set of arms.
//!
//! Each arm carries a Normal posterior `(mean, std)` obtained from a GP fit
//! over every observation so far. Selection draws one sample per arm and
//! returns the largest; exploration comes only from the randomness of the
//! draw.
//!
//! Notes:
//! - This learner is **seedable** so selection can be reproducible in tests.
//! - Default construction uses a fixed seed (deterministic by default).
//! - Arms never pulled still move: the kernel correlates them with nearby
//!   pulled arms.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

use crate::gp::{fit_posterior, GpConfig};
use crate::utils::argmax_first;
use crate::{Error, Result};

/// Per-arm posterior at one point in time, with a 95% band.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PosteriorSnapshot {
    /// Number of observations incorporated when the snapshot was taken.
    pub round: usize,
    pub means: Vec<f64>,
    pub sigmas: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Seedable GP Thompson-sampling learner.
#[derive(Debug, Clone)]
pub struct GptsLearner {
    cfg: GpConfig,
    inputs: Vec<Vec<f64>>,
    means: Vec<f64>,
    sigmas: Vec<f64>,
    history: Vec<(usize, f64)>,
    pulls: Vec<u64>,
    fit_failures: u64,
    length_scale: f64,
    rng: StdRng,
}

impl GptsLearner {
    /// Learner over `n_arms` arms with the arm index as the GP covariate, seed 0.
    pub fn new(n_arms: usize, cfg: GpConfig) -> Result<Self> {
        Self::with_seed(n_arms, cfg, 0)
    }

    /// Like [`GptsLearner::new`] with an explicit seed.
    pub fn with_seed(n_arms: usize, cfg: GpConfig, seed: u64) -> Result<Self> {
        let inputs = (0..n_arms).map(|i| vec![i as f64]).collect();
        Self::with_inputs(inputs, cfg, seed)
    }

    /// Learner whose arm `i` is described by the feature vector `inputs[i]`
    /// (e.g. the allocation's per-campaign spends).
    pub fn with_inputs(inputs: Vec<Vec<f64>>, cfg: GpConfig, seed: u64) -> Result<Self> {
        cfg.validate()?;
        let dim = inputs.first().map(Vec::len).ok_or(Error::EmptyArmInputs)?;
        if dim == 0 || inputs.iter().any(|x| x.len() != dim || x.iter().any(|v| !v.is_finite())) {
            return Err(Error::EmptyArmInputs);
        }
        let n = inputs.len();
        Ok(Self {
            means: vec![0.0; n],
            sigmas: vec![cfg.prior_std; n],
            length_scale: cfg.length_scale,
            cfg,
            inputs,
            history: Vec::new(),
            pulls: vec![0; n],
            fit_failures: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn n_arms(&self) -> usize {
        self.inputs.len()
    }

    /// Posterior means, one per arm.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Posterior standard deviations, one per arm (never below `std_floor`).
    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }

    /// Observations in arrival order.
    pub fn history(&self) -> &[(usize, f64)] {
        &self.history
    }

    /// Rewards in arrival order.
    pub fn collected_rewards(&self) -> Vec<f64> {
        self.history.iter().map(|&(_, r)| r).collect()
    }

    /// Times each arm has been updated.
    pub fn pulls(&self) -> &[u64] {
        &self.pulls
    }

    /// Refits that failed numerically and were skipped.
    pub fn fit_failures(&self) -> u64 {
        self.fit_failures
    }

    /// Length scale used by the most recent successful refit.
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Select an arm by Thompson sampling.
    ///
    /// Draws `N(mean_i, sigma_i)` for every arm and returns the first arm with
    /// the largest draw.
    pub fn pull_arm(&mut self) -> usize {
        let mut best = 0;
        let mut best_sample = f64::NEG_INFINITY;
        for i in 0..self.means.len() {
            let x = self.sample_normal(self.means[i], self.sigmas[i]);
            if x > best_sample {
                best_sample = x;
                best = i;
            }
        }
        best
    }

    fn sample_normal(&mut self, mean: f64, std: f64) -> f64 {
        match Normal::new(mean, std) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    /// Record a reward for `arm` and refit the posterior over the full history.
    ///
    /// If the refit fails numerically the previous posterior is kept and the
    /// observation stays in the history for later refits.
    pub fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        if arm >= self.n_arms() {
            return Err(Error::ArmOutOfRange {
                arm,
                n_arms: self.n_arms(),
            });
        }
        if !reward.is_finite() {
            return Err(Error::NonFiniteReward(reward));
        }
        self.history.push((arm, reward));
        self.pulls[arm] = self.pulls[arm].saturating_add(1);

        match fit_posterior(&self.cfg, &self.inputs, &self.history) {
            Ok(post) => {
                self.means = post.means;
                self.sigmas = post.sigmas;
                self.length_scale = post.length_scale;
            }
            Err(e) => {
                self.fit_failures += 1;
                warn!(arm, reward, observations = self.history.len(), error = %e, "GP refit failed; keeping previous posterior");
            }
        }
        Ok(())
    }

    /// First arm with the largest posterior mean.
    pub fn best_arm(&self) -> usize {
        argmax_first(&self.means).unwrap_or(0)
    }

    /// Current posterior with a 95% band (`mean ± 1.96 std`).
    pub fn posterior_snapshot(&self) -> PosteriorSnapshot {
        const Z95: f64 = 1.96;
        PosteriorSnapshot {
            round: self.history.len(),
            means: self.means.clone(),
            sigmas: self.sigmas.clone(),
            lower: self.means.iter().zip(&self.sigmas).map(|(m, s)| m - Z95 * s).collect(),
            upper: self.means.iter().zip(&self.sigmas).map(|(m, s)| m + Z95 * s).collect(),
        }
    }

    /// Drop every observation and return to the prior.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pulls.iter_mut().for_each(|p| *p = 0);
        self.means.iter_mut().for_each(|m| *m = 0.0);
        let prior_std = self.cfg.prior_std;
        self.sigmas.iter_mut().for_each(|s| *s = prior_std);
        self.length_scale = self.cfg.length_scale;
    }
}
