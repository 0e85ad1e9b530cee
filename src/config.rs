//! Run configuration.
//!
//! Defaults reproduce the reference setup: a cumulative budget of 10 split
//! over three campaigns on the `[0, 1, 3, 5, 8, 10]` grid, 50 rounds per
//! experiment, 50 experiments.

use crate::gp::GpConfig;
use crate::ledger::Combine;
use crate::{budget_allocations, scale_discretization, Allocation, Error, Result};

/// What the GP sees as the covariate of an arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArmEncoding {
    /// The arm's position in the allocation list, as a scalar.
    #[default]
    Index,
    /// The allocation's per-campaign spends, as a vector.
    Allocation,
}

/// Full configuration of an experiment batch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExperimentConfig {
    /// Total spend available across all campaigns.
    pub cumulative_budget: u64,
    /// Budget the base discretization is expressed in.
    pub base_budget: u64,
    /// Spend checkpoints for one campaign, relative to `base_budget`.
    pub base_discretization: Vec<u64>,
    /// Number of campaigns (messages) sharing the budget.
    pub n_campaigns: usize,
    /// Rounds per experiment.
    pub horizon: usize,
    /// Independent experiments.
    pub n_experiments: usize,
    /// Run seed; each experiment derives its own learner seed from it.
    pub seed: u64,
    pub arm_encoding: ArmEncoding,
    /// How experiment winners' learned values are aggregated across experiments.
    pub value_aggregation: Combine,
    /// Record a posterior snapshot of the first experiment every this many
    /// rounds. `None` means every `horizon / 5` rounds; `Some(0)` disables.
    /// The final posterior is always recorded when enabled.
    pub snapshot_every: Option<usize>,
    pub gp: GpConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            cumulative_budget: 10,
            base_budget: 10,
            base_discretization: vec![0, 1, 3, 5, 8, 10],
            n_campaigns: 3,
            horizon: 50,
            n_experiments: 50,
            seed: 0,
            arm_encoding: ArmEncoding::Index,
            value_aggregation: Combine::TwoPointMean,
            snapshot_every: None,
            gp: GpConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Reject every inconsistent combination before any learning starts.
    pub fn validate(&self) -> Result<()> {
        if self.n_campaigns == 0 {
            return Err(Error::ZeroCampaigns);
        }
        if self.horizon == 0 {
            return Err(Error::ZeroHorizon);
        }
        if self.n_experiments == 0 {
            return Err(Error::ZeroExperiments);
        }
        self.gp.validate()?;
        self.allocations().map(|_| ())
    }

    /// Effective snapshot interval in rounds (`0` when disabled).
    pub fn snapshot_interval(&self) -> usize {
        self.snapshot_every.unwrap_or((self.horizon / 5).max(1))
    }

    /// Scaled spend levels for one campaign.
    pub fn discretization(&self) -> Result<Vec<u64>> {
        scale_discretization(&self.base_discretization, self.cumulative_budget, self.base_budget)
    }

    /// Every feasible allocation, in arm order.
    pub fn allocations(&self) -> Result<Vec<Allocation>> {
        budget_allocations(&self.discretization()?, self.cumulative_budget, self.n_campaigns)
    }

    /// GP covariates for `allocations` under the configured encoding.
    pub fn arm_inputs(&self, allocations: &[Allocation]) -> Vec<Vec<f64>> {
        match self.arm_encoding {
            ArmEncoding::Index => (0..allocations.len()).map(|i| vec![i as f64]).collect(),
            ArmEncoding::Allocation => allocations.iter().map(Allocation::to_features).collect(),
        }
    }
}
