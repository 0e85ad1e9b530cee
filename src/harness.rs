//! Experiment driver: repeated independent GPTS runs against an environment,
//! aggregated into a best allocation and a cumulative regret curve.
//!
//! ## Lifecycle of one experiment
//!
//! ```text
//! INIT -> (PULL -> OBSERVE -> UPDATE)* -> FINALIZE
//! ```
//!
//! - **INIT**: a fresh learner sized to the allocation list, seeded from the
//!   run seed and the experiment index.
//! - **PULL**: the learner picks an arm index.
//! - **OBSERVE**: the index is mapped to its allocation and played with
//!   [`Environment::round`].
//! - **UPDATE**: the reward goes back to the learner, and the arm's best known
//!   optimum is raised to [`Environment::opt`] if that is larger.
//! - **FINALIZE**: the arm with the largest posterior mean is the experiment's
//!   winner; its posterior mean is the experiment's learned value.
//!
//! ## Aggregation
//!
//! Records are folded in experiment order: per-arm optima with
//! [`Combine::Max`], winner values with the configured combine policy. The
//! overall best arm is the plurality winner (first encountered wins ties), and
//! regret at round `t` is `Σ_{s ≤ t} (optimum(best arm) − mean reward at s)`.
//! If the best arm was never pulled, its optimum falls back to the largest
//! optimum recorded for any arm.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::ledger::{ArmLedger, Combine};
use crate::utils::{column_means, cumulative_sum, mean, plurality_first};
use crate::{
    experiment_seed, Allocation, BanditPolicy, Environment, Error, ExperimentConfig, GptsLearner,
    PosteriorSnapshot, Result,
};

/// Outcome of one experiment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentRecord {
    pub experiment: usize,
    /// Arm pulled at each round.
    pub arms: Vec<usize>,
    /// Reward collected at each round.
    pub rewards: Vec<f64>,
    /// Arm with the largest posterior mean at the end.
    pub winner: usize,
    /// Posterior mean of `winner` at the end.
    pub winner_value: f64,
    /// Largest `opt()` seen right after each pull, per pulled arm.
    pub optima: BTreeMap<usize, f64>,
    /// Refits skipped because of numeric failure.
    pub fit_failures: u64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub snapshots: Vec<PosteriorSnapshot>,
}

impl ExperimentRecord {
    /// Fraction of rounds in `range` spent on `arm`.
    pub fn pull_fraction(&self, arm: usize, range: std::ops::Range<usize>) -> f64 {
        let window = &self.arms[range.start.min(self.arms.len())..range.end.min(self.arms.len())];
        if window.is_empty() {
            return 0.0;
        }
        window.iter().filter(|&&a| a == arm).count() as f64 / window.len() as f64
    }
}

/// Aggregate result of an experiment batch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    /// Plurality winner across experiments.
    pub best_arm: usize,
    pub best_allocation: Allocation,
    /// Aggregated learned value of `best_arm`.
    pub best_value: f64,
    /// Oracle optimum used for the regret curve.
    pub optimum: f64,
    /// Winner of each experiment, in experiment order.
    pub winners: Vec<usize>,
    /// Collected rewards, experiments × horizon.
    pub rewards: Vec<Vec<f64>>,
    /// Mean reward per round across experiments.
    pub mean_rewards: Vec<f64>,
    /// Cumulative regret per round.
    pub regret: Vec<f64>,
    /// Best known optimum per pulled arm.
    pub optima: BTreeMap<usize, f64>,
    /// Aggregated learned value per experiment winner.
    pub values: BTreeMap<usize, f64>,
    /// Posterior snapshots of the first experiment.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub snapshots: Vec<PosteriorSnapshot>,
}

/// Runs experiment batches for one configuration.
///
/// The allocation list and arm covariates are computed once and shared
/// read-only by every experiment.
#[derive(Debug, Clone)]
pub struct ExperimentDriver {
    cfg: ExperimentConfig,
    allocations: Vec<Allocation>,
    inputs: Vec<Vec<f64>>,
}

impl ExperimentDriver {
    /// Validate `cfg` and enumerate its allocations.
    pub fn new(cfg: ExperimentConfig) -> Result<Self> {
        cfg.validate()?;
        let allocations = cfg.allocations()?;
        let inputs = cfg.arm_inputs(&allocations);
        info!(
            arms = allocations.len(),
            campaigns = cfg.n_campaigns,
            budget = cfg.cumulative_budget,
            horizon = cfg.horizon,
            experiments = cfg.n_experiments,
            "enumerated budget allocations"
        );
        Ok(Self {
            cfg,
            allocations,
            inputs,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.cfg
    }

    /// Allocations in arm order.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Fresh GPTS learner for experiment `experiment`.
    pub fn new_learner(&self, experiment: usize) -> Result<GptsLearner> {
        GptsLearner::with_inputs(
            self.inputs.clone(),
            self.cfg.gp.clone(),
            experiment_seed(self.cfg.seed, experiment),
        )
    }

    /// Run every experiment against one shared environment.
    pub fn run<E: Environment>(&self, env: &mut E) -> Result<RunReport> {
        self.run_with_policy(env, |e| self.new_learner(e))
    }

    /// Run every experiment against one shared environment with a caller-built policy.
    pub fn run_with_policy<E, P, F>(&self, env: &mut E, mut make_policy: F) -> Result<RunReport>
    where
        E: Environment,
        P: BanditPolicy,
        F: FnMut(usize) -> Result<P>,
    {
        let mut records = Vec::with_capacity(self.cfg.n_experiments);
        for e in 0..self.cfg.n_experiments {
            let policy = make_policy(e)?;
            records.push(self.run_experiment(e, policy, &mut *env)?);
        }
        self.aggregate(records)
    }

    /// Run every experiment against its own environment, sequentially.
    pub fn run_each<E, F>(&self, mut make_env: F) -> Result<RunReport>
    where
        E: Environment,
        F: FnMut(usize) -> E,
    {
        let mut records = Vec::with_capacity(self.cfg.n_experiments);
        for e in 0..self.cfg.n_experiments {
            let mut env = make_env(e);
            records.push(self.run_experiment(e, self.new_learner(e)?, &mut env)?);
        }
        self.aggregate(records)
    }

    /// Run every experiment against its own environment on the rayon pool.
    ///
    /// Produces the same report as [`ExperimentDriver::run_each`] with the same
    /// environment factory.
    #[cfg(feature = "parallel")]
    pub fn run_parallel<E, F>(&self, make_env: F) -> Result<RunReport>
    where
        E: Environment,
        F: Fn(usize) -> E + Sync,
    {
        use rayon::prelude::*;

        let records = (0..self.cfg.n_experiments)
            .into_par_iter()
            .map(|e| {
                let mut env = make_env(e);
                self.run_experiment(e, self.new_learner(e)?, &mut env)
            })
            .collect::<Result<Vec<_>>>()?;
        self.aggregate(records)
    }

    /// Run one experiment for the configured horizon.
    ///
    /// The policy must have exactly one arm per allocation. An environment
    /// failure aborts the experiment.
    pub fn run_experiment<E, P>(&self, experiment: usize, mut policy: P, env: &mut E) -> Result<ExperimentRecord>
    where
        E: Environment,
        P: BanditPolicy,
    {
        let n_arms = self.allocations.len();
        if policy.n_arms() != n_arms {
            return Err(Error::PolicySizeMismatch {
                policy_arms: policy.n_arms(),
                n_arms,
            });
        }

        let horizon = self.cfg.horizon;
        let mut optima = ArmLedger::new(Combine::Max);
        let mut arms = Vec::with_capacity(horizon);
        let mut rewards = Vec::with_capacity(horizon);
        let mut snapshots = Vec::new();
        let snapshot_every = if experiment == 0 { self.cfg.snapshot_interval() } else { 0 };

        let env_err = |round: usize| {
            move |e: E::Error| Error::Environment {
                experiment,
                round,
                source: Box::new(e),
            }
        };

        for t in 0..horizon {
            let arm = policy.pull_arm();
            let allocation = self.allocations.get(arm).ok_or(Error::ArmOutOfRange { arm, n_arms })?;
            let reward = env.round(allocation).map_err(env_err(t))?;
            policy.update(arm, reward)?;
            let opt = env.opt().map_err(env_err(t))?;
            optima.upsert(arm, opt);

            arms.push(arm);
            rewards.push(reward);
            debug!(
                experiment,
                round = t,
                arm,
                %allocation,
                reward,
                opt,
                means = ?policy.means(),
                "round"
            );

            if snapshot_every > 0 && t % snapshot_every == 0 {
                snapshots.extend(policy.snapshot());
            }
        }
        if snapshot_every > 0 {
            snapshots.extend(policy.snapshot());
        }

        let winner = policy.best_arm();
        let allocation = self
            .allocations
            .get(winner)
            .ok_or(Error::ArmOutOfRange { arm: winner, n_arms })?;
        let winner_value = policy.means().get(winner).copied().unwrap_or(0.0);
        let fit_failures = policy.fit_failures();
        info!(
            experiment,
            winner,
            %allocation,
            value = winner_value,
            mean_reward = mean(&rewards),
            fit_failures,
            "experiment finished"
        );

        Ok(ExperimentRecord {
            experiment,
            arms,
            rewards,
            winner,
            winner_value,
            optima: optima.to_map(),
            fit_failures,
            snapshots,
        })
    }

    /// Fold experiment records, in order, into a report.
    ///
    /// Fails on an empty batch, on records of different lengths, or on a
    /// winner outside the allocation list.
    pub fn aggregate(&self, records: Vec<ExperimentRecord>) -> Result<RunReport> {
        if records.is_empty() {
            return Err(Error::NoExperimentRecords);
        }
        let n_arms = self.allocations.len();
        if let Some(r) = records.iter().find(|r| r.winner >= n_arms) {
            return Err(Error::ArmOutOfRange { arm: r.winner, n_arms });
        }
        let rounds = records[0].rewards.len();
        if let Some(r) = records.iter().find(|r| r.rewards.len() != rounds) {
            return Err(Error::RaggedRecords {
                experiment: r.experiment,
                rounds: r.rewards.len(),
                expected: rounds,
            });
        }

        let mut opt_ledger = ArmLedger::new(Combine::Max);
        let mut value_ledger = ArmLedger::new(self.cfg.value_aggregation);
        for r in &records {
            for (&arm, &opt) in &r.optima {
                opt_ledger.upsert(arm, opt);
            }
            value_ledger.upsert(r.winner, r.winner_value);
        }

        let winners: Vec<usize> = records.iter().map(|r| r.winner).collect();
        let best_arm = plurality_first(&winners).ok_or(Error::NoExperimentRecords)?;
        let best_allocation = self
            .allocations
            .get(best_arm)
            .cloned()
            .ok_or(Error::ArmOutOfRange { arm: best_arm, n_arms })?;
        let optimum = opt_ledger
            .get(best_arm)
            .or_else(|| opt_ledger.max_value())
            .unwrap_or(0.0);

        let mut snapshots = Vec::new();
        let mut rewards = Vec::with_capacity(records.len());
        for r in records {
            if r.experiment == 0 {
                snapshots = r.snapshots;
            }
            rewards.push(r.rewards);
        }
        let mean_rewards = column_means(&rewards);
        let regret = cumulative_sum(mean_rewards.iter().map(|m| optimum - m));

        let report = RunReport {
            best_arm,
            best_allocation,
            best_value: value_ledger.get(best_arm).unwrap_or(0.0),
            optimum,
            winners,
            rewards,
            mean_rewards,
            regret,
            optima: opt_ledger.to_map(),
            values: value_ledger.to_map(),
            snapshots,
        };
        info!(
            best_arm = report.best_arm,
            allocation = %report.best_allocation,
            value = report.best_value,
            final_regret = report.regret.last().copied().unwrap_or(0.0),
            "best budget allocation"
        );
        Ok(report)
    }
}
