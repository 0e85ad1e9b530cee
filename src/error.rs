//! Crate error type.
//!
//! Configuration errors are rejected before any learning loop starts.
//! Environment errors abort the experiment they occur in. Numeric failures
//! inside a posterior refit never surface here: the learner recovers from them.

/// Errors produced by allocation enumeration, learners, and the experiment driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discretization vector is empty")]
    EmptyDiscretization,

    #[error("discretization vector must start at 0 (got {first})")]
    DiscretizationNotZeroBased { first: u64 },

    #[error("discretization vector must be non-decreasing")]
    UnsortedDiscretization,

    #[error("base budget must be positive")]
    ZeroBaseBudget,

    #[error("total budget {budget} is below the largest spend level {max_level}")]
    BudgetBelowMaxLevel { budget: u64, max_level: u64 },

    #[error("number of campaigns must be at least 1")]
    ZeroCampaigns,

    #[error("horizon must be at least 1 round")]
    ZeroHorizon,

    #[error("number of experiments must be at least 1")]
    ZeroExperiments,

    #[error("no allocation satisfies the budget constraint")]
    NoFeasibleAllocation,

    #[error("invalid GP configuration: {0}")]
    InvalidGpConfig(&'static str),

    #[error("arm inputs are empty or ragged")]
    EmptyArmInputs,

    #[error("arm {arm} out of range (learner has {n_arms} arms)")]
    ArmOutOfRange { arm: usize, n_arms: usize },

    #[error("policy has {policy_arms} arms but there are {n_arms} allocations")]
    PolicySizeMismatch { policy_arms: usize, n_arms: usize },

    #[error("no experiment records to aggregate")]
    NoExperimentRecords,

    #[error("experiment {experiment} has {rounds} rounds, expected {expected}")]
    RaggedRecords {
        experiment: usize,
        rounds: usize,
        expected: usize,
    },

    #[error("reward must be finite (got {0})")]
    NonFiniteReward(f64),

    #[error("noise std must be finite and >= 0 (got {0})")]
    InvalidNoise(f64),

    #[error("{weights} response weights but {scales} response scales")]
    CurveLengthMismatch { weights: usize, scales: usize },

    #[error("GP fit failed: {0}")]
    FitFailed(&'static str),

    #[error("allocation {0} is not known to the environment")]
    UnknownAllocation(String),

    #[error("environment failed in experiment {experiment}, round {round}: {source}")]
    Environment {
        experiment: usize,
        round: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Crate result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
