//! `gpts-alloc`: budget-allocation search with Gaussian-process Thompson sampling.
//!
//! The problem: a fixed cumulative budget must be split across several
//! independent campaigns ("messages"), and the reward of each split is unknown
//! and noisy. Each feasible split is treated as a bandit arm; a Gaussian
//! process models reward as a smooth function over arms, and Thompson
//! sampling from its posterior decides which split to probe next.
//!
//! The crate is organized leaves-first:
//!
//! - [`scale_discretization`] / [`budget_allocations`]: the arm set. Every
//!   per-campaign spend tuple on the scaled grid whose total fits the budget,
//!   in lexicographic order. The order is the arm-index contract.
//! - [`fit_posterior`] / [`GpConfig`]: GP regression over arms (RBF or
//!   Matérn 5/2 kernel, Cholesky fit, normalized targets, optional
//!   length-scale selection by marginal likelihood).
//! - [`GptsLearner`]: the Thompson-sampling learner. Seedable; refits the
//!   posterior from the full history after every update; keeps the previous
//!   posterior when a refit fails numerically.
//! - [`Environment`]: the external reward source (`round` / `opt`).
//!   [`TableEnvironment`] is a synthetic implementation with a known
//!   expected-reward table.
//! - [`ArmLedger`]: per-arm bookkeeping with an explicit combine policy.
//! - [`ExperimentDriver`]: repeats independent experiments, picks the
//!   plurality-best allocation and computes the cumulative regret curve.
//!
//! **Goals:**
//! - **Deterministic by default**: same configuration and seed → same report.
//! - **No ambient state**: all bookkeeping is owned by the driver and returned
//!   as values ([`ExperimentRecord`], [`RunReport`]).
//! - **Recoverable numerics**: a singular kernel matrix skips one refit, never
//!   an experiment.
//!
//! **Non-goals:**
//! - How rewards arise (influence propagation, seed-node selection) is the
//!   environment's concern.
//! - No plotting; the regret curve is exposed as a `Vec<f64>`.
//!
//! # Example
//!
//! ```rust
//! use gpts_alloc::{ExperimentConfig, ExperimentDriver, TableEnvironment};
//!
//! let cfg = ExperimentConfig {
//!     n_campaigns: 2,
//!     horizon: 10,
//!     n_experiments: 2,
//!     ..ExperimentConfig::default()
//! };
//! let driver = ExperimentDriver::new(cfg).unwrap();
//!
//! // Reward is the total spend on the first campaign.
//! let table = driver
//!     .allocations()
//!     .iter()
//!     .map(|a| (a.clone(), a.spends()[0] as f64))
//!     .collect();
//! let mut env = TableEnvironment::new(table, 0.1, 0).unwrap();
//!
//! let report = driver.run(&mut env).unwrap();
//! assert_eq!(report.regret.len(), 10);
//! ```
//!
//! # Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` for configuration and reports.
//! - `parallel`: [`ExperimentDriver::run_parallel`] on rayon's pool.
//! - `cli`: the `gpts-alloc` binary.

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod alloc;
pub use alloc::*;

mod utils;
pub use utils::*;

mod stable_hash;
pub use stable_hash::*;

mod gp;
pub use gp::*;

mod gpts;
pub use gpts::*;

mod policy;
pub use policy::BanditPolicy;

mod env;
pub use env::*;

mod ledger;
pub use ledger::*;

mod config;
pub use config::*;

mod harness;
pub use harness::*;
