//! Gaussian-process regression over a fixed, finite set of arms.
//!
//! The posterior is always refit from the full observation history. Repeated
//! observations of one arm are first collapsed into their mean with noise
//! variance `noise_variance / count`; for a Gaussian likelihood this yields the
//! same posterior as fitting every observation separately, while keeping the
//! kernel matrix no larger than the number of distinct arms pulled.
//!
//! Targets are optionally normalized (centred, scaled by their population
//! standard deviation) before fitting, and predictions are mapped back.

use std::collections::BTreeMap;

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::utils::{mean, population_std};
use crate::{Error, Result};

/// Covariance function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Kernel {
    /// Squared exponential: `σ² exp(-r² / 2)`.
    #[default]
    Rbf,
    /// Matérn 5/2: `σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`.
    Matern52,
}

/// GP and Thompson-sampling configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GpConfig {
    pub kernel: Kernel,
    /// Isotropic length scale `l` (distances are divided by it).
    pub length_scale: f64,
    /// Kernel amplitude `σ²` (in normalized target units when `normalize_y`).
    pub signal_variance: f64,
    /// Observation noise variance added to the kernel diagonal.
    pub noise_variance: f64,
    /// Posterior std of every arm before the first observation.
    pub prior_std: f64,
    /// Lower bound applied to every posterior std.
    pub std_floor: f64,
    /// Centre and scale rewards before fitting.
    pub normalize_y: bool,
    /// If non-empty, each refit picks the length scale from this grid that
    /// maximizes the log marginal likelihood (ignoring `length_scale`).
    pub length_scale_grid: Vec<f64>,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Rbf,
            length_scale: 1.0,
            signal_variance: 1.0,
            noise_variance: 0.1,
            prior_std: 10.0,
            std_floor: 1e-2,
            normalize_y: true,
            length_scale_grid: Vec::new(),
        }
    }
}

impl GpConfig {
    pub fn validate(&self) -> Result<()> {
        let pos = |x: f64| x.is_finite() && x > 0.0;
        if !pos(self.length_scale) {
            return Err(Error::InvalidGpConfig("length_scale must be finite and > 0"));
        }
        if !pos(self.signal_variance) {
            return Err(Error::InvalidGpConfig("signal_variance must be finite and > 0"));
        }
        if !(self.noise_variance.is_finite() && self.noise_variance >= 0.0) {
            return Err(Error::InvalidGpConfig("noise_variance must be finite and >= 0"));
        }
        if !pos(self.prior_std) {
            return Err(Error::InvalidGpConfig("prior_std must be finite and > 0"));
        }
        if !pos(self.std_floor) {
            return Err(Error::InvalidGpConfig("std_floor must be finite and > 0"));
        }
        if !self.length_scale_grid.iter().all(|&l| pos(l)) {
            return Err(Error::InvalidGpConfig("length_scale_grid entries must be finite and > 0"));
        }
        Ok(())
    }
}

/// Posterior over every arm after one refit.
#[derive(Debug, Clone, PartialEq)]
pub struct GpPosterior {
    pub means: Vec<f64>,
    pub sigmas: Vec<f64>,
    /// Length scale actually used (differs from the config when a grid is set).
    pub length_scale: f64,
    /// Log marginal likelihood of the collapsed data at `length_scale`.
    pub log_marginal_likelihood: f64,
}

/// Evaluate the kernel between two inputs.
pub fn kernel_value(kernel: Kernel, a: &[f64], b: &[f64], length_scale: f64, signal_variance: f64) -> f64 {
    let r_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (x - y) / length_scale;
            d * d
        })
        .sum();
    match kernel {
        Kernel::Rbf => signal_variance * (-0.5 * r_sq).exp(),
        Kernel::Matern52 => {
            let sqrt5_r = (5.0 * r_sq).sqrt();
            signal_variance * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
        }
    }
}

struct Collapsed {
    arms: Vec<usize>,
    counts: Vec<f64>,
    y: DVector<f64>,
    y_mean: f64,
    y_scale: f64,
}

fn collapse(history: &[(usize, f64)], normalize_y: bool) -> Collapsed {
    let ys: Vec<f64> = history.iter().map(|&(_, r)| r).collect();
    let (y_mean, y_scale) = if normalize_y {
        let s = population_std(&ys);
        (mean(&ys), if s > 0.0 { s } else { 1.0 })
    } else {
        (0.0, 1.0)
    };

    let mut by_arm: BTreeMap<usize, (f64, u64)> = BTreeMap::new();
    for &(arm, r) in history {
        let e = by_arm.entry(arm).or_insert((0.0, 0));
        e.0 += (r - y_mean) / y_scale;
        e.1 += 1;
    }
    let arms: Vec<usize> = by_arm.keys().copied().collect();
    let counts: Vec<f64> = by_arm.values().map(|&(_, c)| c as f64).collect();
    let y = DVector::from_iterator(arms.len(), by_arm.values().map(|&(s, c)| s / c as f64));
    Collapsed {
        arms,
        counts,
        y,
        y_mean,
        y_scale,
    }
}

struct Model {
    cholesky: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    length_scale: f64,
    lml: f64,
}

fn fit_model(cfg: &GpConfig, inputs: &[Vec<f64>], data: &Collapsed, length_scale: f64) -> Option<Model> {
    let m = data.arms.len();
    let k = DMatrix::from_fn(m, m, |i, j| {
        let v = kernel_value(
            cfg.kernel,
            &inputs[data.arms[i]],
            &inputs[data.arms[j]],
            length_scale,
            cfg.signal_variance,
        );
        if i == j {
            v + cfg.noise_variance / data.counts[i]
        } else {
            v
        }
    });
    let cholesky = Cholesky::new(k)?;
    let alpha = cholesky.solve(&data.y);

    let log_det_half: f64 = cholesky.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
    let lml = -0.5 * data.y.dot(&alpha) - log_det_half - 0.5 * m as f64 * (2.0 * std::f64::consts::PI).ln();
    if !lml.is_finite() {
        return None;
    }
    Some(Model {
        cholesky,
        alpha,
        length_scale,
        lml,
    })
}

/// Fit the GP to `history` and predict every arm in `inputs`.
///
/// `history` holds `(arm, reward)` pairs; every arm must index into `inputs`.
/// Returns [`Error::FitFailed`] if no candidate length scale yields a
/// positive-definite kernel matrix or the posterior is not finite.
pub fn fit_posterior(cfg: &GpConfig, inputs: &[Vec<f64>], history: &[(usize, f64)]) -> Result<GpPosterior> {
    if history.is_empty() {
        return Err(Error::FitFailed("no observations"));
    }
    if history.iter().any(|&(arm, _)| arm >= inputs.len()) {
        return Err(Error::FitFailed("observation arm outside input set"));
    }
    let data = collapse(history, cfg.normalize_y);

    let candidates: &[f64] = if cfg.length_scale_grid.is_empty() {
        std::slice::from_ref(&cfg.length_scale)
    } else {
        &cfg.length_scale_grid
    };
    let model = candidates
        .iter()
        .filter_map(|&l| fit_model(cfg, inputs, &data, l))
        .fold(None::<Model>, |best, m| match best {
            Some(b) if b.lml >= m.lml => Some(b),
            _ => Some(m),
        })
        .ok_or(Error::FitFailed("kernel matrix is not positive definite"))?;

    let mut means = Vec::with_capacity(inputs.len());
    let mut sigmas = Vec::with_capacity(inputs.len());
    for x in inputs {
        let k_star = DVector::from_fn(data.arms.len(), |i, _| {
            kernel_value(cfg.kernel, x, &inputs[data.arms[i]], model.length_scale, cfg.signal_variance)
        });
        let mu = k_star.dot(&model.alpha);
        let v = model.cholesky.solve(&k_star);
        let k_self = kernel_value(cfg.kernel, x, x, model.length_scale, cfg.signal_variance);
        let var = (k_self - k_star.dot(&v)).max(0.0);

        let mean = mu * data.y_scale + data.y_mean;
        let sigma = (var.sqrt() * data.y_scale).max(cfg.std_floor);
        if !(mean.is_finite() && sigma.is_finite()) {
            return Err(Error::FitFailed("posterior is not finite"));
        }
        means.push(mean);
        sigmas.push(sigma);
    }

    Ok(GpPosterior {
        means,
        sigmas,
        length_scale: model.length_scale,
        log_marginal_likelihood: model.lml,
    })
}
