//! Reward sources.
//!
//! The driver consumes an environment only through [`Environment::round`]
//! (one stochastic reward for an allocation) and [`Environment::opt`] (the
//! best expected reward under the environment's current state). How rewards
//! arise, e.g. an influence cascade over a social network, is the
//! environment's business.
//!
//! [`TableEnvironment`] is a synthetic source with a known expected-reward
//! table, used for testing, benchmarking and the CLI.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::{Allocation, Error, Result};

/// External reward source.
pub trait Environment {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Play one round with `allocation` and return the observed reward.
    fn round(&mut self, allocation: &Allocation) -> Result<f64, Self::Error>;

    /// Best achievable expected reward in the current state.
    ///
    /// May change between rounds.
    fn opt(&mut self) -> Result<f64, Self::Error>;
}

impl<E: Environment + ?Sized> Environment for &mut E {
    type Error = E::Error;

    fn round(&mut self, allocation: &Allocation) -> Result<f64, Self::Error> {
        (**self).round(allocation)
    }

    fn opt(&mut self) -> Result<f64, Self::Error> {
        (**self).opt()
    }
}

/// Saturating response of one campaign to spend: `weight · (1 − exp(−spend / scale))`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseCurve {
    pub weight: f64,
    pub scale: f64,
}

impl ResponseCurve {
    pub fn value(&self, spend: u64) -> f64 {
        if self.scale <= 0.0 {
            return if spend > 0 { self.weight } else { 0.0 };
        }
        self.weight * (1.0 - (-(spend as f64) / self.scale).exp())
    }

    /// Pair per-campaign weights with per-campaign scales.
    pub fn from_parts(weights: &[f64], scales: &[f64]) -> Result<Vec<Self>> {
        if weights.len() != scales.len() {
            return Err(Error::CurveLengthMismatch {
                weights: weights.len(),
                scales: scales.len(),
            });
        }
        Ok(weights
            .iter()
            .zip(scales)
            .map(|(&weight, &scale)| Self { weight, scale })
            .collect())
    }
}

/// Synthetic environment with a fixed expected reward per allocation plus
/// Gaussian noise.
#[derive(Debug, Clone)]
pub struct TableEnvironment {
    table: BTreeMap<Allocation, f64>,
    noise: Option<Normal<f64>>,
    optimum: f64,
    rng: StdRng,
}

impl TableEnvironment {
    /// Environment returning `table[allocation] + N(0, noise_std)`.
    ///
    /// `noise_std == 0` makes rewards deterministic; a negative or non-finite
    /// `noise_std` is rejected.
    pub fn new(table: BTreeMap<Allocation, f64>, noise_std: f64, seed: u64) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::NoFeasibleAllocation);
        }
        if let Some(&bad) = table.values().find(|v| !v.is_finite()) {
            return Err(Error::NonFiniteReward(bad));
        }
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(Error::InvalidNoise(noise_std));
        }
        let noise = if noise_std > 0.0 {
            Some(Normal::new(0.0, noise_std).map_err(|_| Error::InvalidNoise(noise_std))?)
        } else {
            None
        };
        let optimum = table.values().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            table,
            noise,
            optimum,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Expected reward from summing one [`ResponseCurve`] per campaign.
    ///
    /// Campaigns beyond `curves.len()` contribute nothing.
    pub fn from_response_curves(
        allocations: &[Allocation],
        curves: &[ResponseCurve],
        noise_std: f64,
        seed: u64,
    ) -> Result<Self> {
        let table = allocations
            .iter()
            .map(|a| {
                let v: f64 = a
                    .spends()
                    .iter()
                    .zip(curves)
                    .map(|(&s, c)| c.value(s))
                    .sum();
                (a.clone(), v)
            })
            .collect();
        Self::new(table, noise_std, seed)
    }

    /// Expected reward of `allocation`, if known.
    pub fn expected(&self, allocation: &Allocation) -> Option<f64> {
        self.table.get(allocation).copied()
    }

    /// Allocation with the largest expected reward (first in order on ties).
    pub fn best_allocation(&self) -> Option<&Allocation> {
        self.table
            .iter()
            .find(|&(_, &v)| v == self.optimum)
            .map(|(a, _)| a)
    }
}

impl Environment for TableEnvironment {
    type Error = Error;

    fn round(&mut self, allocation: &Allocation) -> Result<f64> {
        let mean = self
            .expected(allocation)
            .ok_or_else(|| Error::UnknownAllocation(allocation.to_string()))?;
        Ok(match &self.noise {
            Some(n) => mean + n.sample(&mut self.rng),
            None => mean,
        })
    }

    fn opt(&mut self) -> Result<f64> {
        Ok(self.optimum)
    }
}
