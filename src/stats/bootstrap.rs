//! Percentile bootstrap confidence interval for the activation energy
//!
//! Experiments are drawn with replacement, the resample is fitted, and the
//! distribution of fitted Ea values gives the interval. Index sets are drawn
//! up front from one seeded generator so the result does not depend on how
//! the fits are scheduled across threads.

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

use crate::data::Experiment;
use crate::error::SinterError;
use crate::kinetics::{try_fit, FitOptions};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BootstrapOptions {
    pub n_resamples: usize,
    /// Two-sided level, the interval spans the `alpha/2` and `1 − alpha/2` quantiles
    pub alpha: f64,
    /// Seed of the resampling generator, a fresh one is drawn when `None`
    pub seed: Option<u64>,
    /// Options for every replicate fit
    pub fit: FitOptions,
    /// Show a progress bar on stderr
    pub progress: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        BootstrapOptions {
            n_resamples: 1000,
            alpha: 0.05,
            seed: None,
            fit: FitOptions::default(),
            progress: false,
        }
    }
}

impl BootstrapOptions {
    pub fn with_resamples(mut self, n_resamples: usize) -> Self {
        self.n_resamples = n_resamples;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fit_options(mut self, fit: FitOptions) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Interval bounds are `statrs` quantiles (R-8 estimator), which can differ
/// slightly from linearly interpolated (R-7) percentiles on small samples.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BootstrapResult {
    pub ci_low_kj: f64,
    pub ci_high_kj: f64,
    /// Ea of every successful resample, in resample order
    pub estimates: Vec<f64>,
    /// Resamples whose fit failed and were skipped
    pub n_failed: usize,
}

impl BootstrapResult {
    pub fn interval(&self) -> (f64, f64) {
        (self.ci_low_kj, self.ci_high_kj)
    }
}

/// `alpha/2` and `1 − alpha/2` quantiles of `values`
fn percentile_interval(values: &[f64], alpha: f64) -> (f64, f64) {
    let mut data = Data::new(values.to_vec());
    (data.quantile(alpha / 2.0), data.quantile(1.0 - alpha / 2.0))
}

/// Percentile confidence interval of Ea over `options.n_resamples` resamples
///
/// # Errors
///
/// [SinterError::InvalidInput] for an empty experiment list, zero resamples,
/// `alpha ∉ (0, 1)`, or when no resample could be fitted.
pub fn confidence_interval(
    experiments: &[Experiment],
    options: &BootstrapOptions,
) -> Result<BootstrapResult, SinterError> {
    if experiments.is_empty() {
        return Err(SinterError::invalid("no experiments to resample"));
    }
    if options.n_resamples == 0 {
        return Err(SinterError::invalid("number of resamples must be positive"));
    }
    if !(options.alpha > 0.0 && options.alpha < 1.0) {
        return Err(SinterError::invalid(format!(
            "alpha must lie in (0, 1), got {}",
            options.alpha
        )));
    }

    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let n = experiments.len();
    let draws: Vec<Vec<usize>> = (0..options.n_resamples)
        .map(|_| (0..n).map(|_| rng.random_range(0..n)).collect())
        .collect();

    let progress = if options.progress {
        let bar = ProgressBar::new(options.n_resamples as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} bootstrap [{bar:40}] {pos}/{len} ETA {eta}")
        {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let fits: Vec<Option<f64>> = draws
        .into_par_iter()
        .map(|indices| {
            let resample: Vec<Experiment> =
                indices.iter().map(|&i| experiments[i].clone()).collect();
            let estimate = try_fit(&resample, &options.fit).map(|p| p.ea_kj);
            progress.inc(1);
            estimate
        })
        .collect();
    progress.finish_and_clear();

    let estimates: Vec<f64> = fits.iter().flatten().copied().collect();
    let n_failed = fits.len() - estimates.len();
    if n_failed > 0 {
        tracing::warn!(n_failed, "bootstrap resamples could not be fitted and were skipped");
    }
    if estimates.is_empty() {
        return Err(SinterError::invalid(format!(
            "all {} bootstrap resamples failed to fit",
            options.n_resamples
        )));
    }

    let (ci_low_kj, ci_high_kj) = percentile_interval(&estimates, options.alpha);
    tracing::info!(
        seed,
        successful = estimates.len(),
        ci_low_kj,
        ci_high_kj,
        "bootstrap confidence interval"
    );

    Ok(BootstrapResult {
        ci_low_kj,
        ci_high_kj,
        estimates,
        n_failed,
    })
}
