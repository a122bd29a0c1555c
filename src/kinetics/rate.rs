//! Point-wise rate coefficients from a densification series
//!
//! Two estimators turn `(t, T, ρ)` samples into `(T, ln k)` pairs for the
//! Arrhenius regression:
//!
//! * [RateEstimator::Integral] uses `k = −ln(1 − x) / t`, exact for a first
//!   order isothermal run started from zero density.
//! * [RateEstimator::Gradient] differentiates the density numerically and uses
//!   `k = (dx/dt) / (1 − x)`; usable for slow ramps.
//!
//! Only physically meaningful points are returned: `0 < x < 1`, a positive
//! finite rate and, for the integral estimator, `t > 0`. Samples at or after
//! the first sample reaching full density are discarded.

use serde::{Deserialize, Serialize};

use crate::data::{Experiment, CELSIUS_TO_KELVIN};
use crate::error::SinterError;

/// Strategy used to derive rate coefficients from density data
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateEstimator {
    /// `k = −ln(1 − x) / t`
    ///
    /// Assumes the whole history ran at the current temperature, so on heating
    /// ramps it underestimates Ea; use [RateEstimator::Gradient] for ramp data.
    #[default]
    Integral,
    /// `k = (dx/dt) / (1 − x)` with a second order finite difference
    Gradient,
}

/// Valid `(T, ln k)` pairs, pooled over one or more experiments
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RatePoints {
    pub temperature_k: Vec<f64>,
    pub ln_rate: Vec<f64>,
}

impl RatePoints {
    pub fn len(&self) -> usize {
        self.ln_rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ln_rate.is_empty()
    }

    /// Abscissa of the Arrhenius plot, `1/T`
    pub fn inverse_temperature(&self) -> Vec<f64> {
        self.temperature_k.iter().map(|t| 1.0 / t).collect()
    }

    /// Append the points of another set
    pub fn extend(&mut self, other: RatePoints) {
        self.temperature_k.extend(other.temperature_k);
        self.ln_rate.extend(other.ln_rate);
    }

    fn push(&mut self, temperature_k: f64, rate: f64) {
        self.temperature_k.push(temperature_k);
        self.ln_rate.push(rate.ln());
    }
}

impl RateEstimator {
    /// Rate points of a single experiment
    pub fn estimate(&self, experiment: &Experiment) -> RatePoints {
        self.estimate_columns(
            &experiment.times(),
            &experiment.temperatures_k(),
            &experiment.density_fractions(),
        )
    }

    /// Pool the rate points of several experiments, each estimated on its own
    pub fn estimate_pooled(&self, experiments: &[Experiment]) -> RatePoints {
        experiments
            .iter()
            .fold(RatePoints::default(), |mut pooled, experiment| {
                pooled.extend(self.estimate(experiment));
                pooled
            })
    }

    fn estimate_columns(&self, time: &[f64], temperature_k: &[f64], x: &[f64]) -> RatePoints {
        let end = x.iter().position(|&v| v >= 1.0).unwrap_or(x.len());
        let (time, temperature_k, x) = (&time[..end], &temperature_k[..end], &x[..end]);

        let mut points = RatePoints::default();
        match self {
            RateEstimator::Integral => {
                for i in 0..end {
                    if time[i] <= 0.0 || !(x[i] > 0.0 && x[i] < 1.0) {
                        continue;
                    }
                    let rate = -(1.0 - x[i]).ln() / time[i];
                    if rate > 0.0 && rate.is_finite() {
                        points.push(temperature_k[i], rate);
                    }
                }
            }
            RateEstimator::Gradient => {
                let slope = gradient(x, time);
                for i in 0..slope.len() {
                    if !(x[i] > 0.0 && x[i] < 1.0) {
                        continue;
                    }
                    let rate = slope[i] / (1.0 - x[i]);
                    if rate > 0.0 && rate.is_finite() {
                        points.push(temperature_k[i], rate);
                    }
                }
            }
        }
        points
    }
}

/// Numerical derivative of `y` with respect to `t` on a non-uniform grid
///
/// Second order central differences inside, first order one-sided differences
/// at both ends. Repeated time stamps yield non-finite entries.
pub(crate) fn gradient(y: &[f64], t: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return Vec::new();
    }
    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (t[1] - t[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (t[n - 1] - t[n - 2]);
    for i in 1..n - 1 {
        let hs = t[i] - t[i - 1];
        let hd = t[i + 1] - t[i];
        out[i] = (hs * hs * y[i + 1] + (hd * hd - hs * hs) * y[i] - hd * hd * y[i - 1])
            / (hs * hd * (hd + hs));
    }
    out
}

/// Rate points from raw columns in seconds, °C and density percent
///
/// # Errors
///
/// [SinterError::InvalidInput] if the columns differ in length.
pub fn pointwise_rate(
    time_s: &[f64],
    temperature_c: &[f64],
    density_pct: &[f64],
    estimator: RateEstimator,
) -> Result<RatePoints, SinterError> {
    if time_s.len() != temperature_c.len() || time_s.len() != density_pct.len() {
        return Err(SinterError::invalid(format!(
            "column lengths differ: time={}, temperature={}, density={}",
            time_s.len(),
            temperature_c.len(),
            density_pct.len()
        )));
    }
    let temperature_k: Vec<f64> = temperature_c.iter().map(|t| t + CELSIUS_TO_KELVIN).collect();
    let x: Vec<f64> = density_pct.iter().map(|d| d / 100.0).collect();
    Ok(estimator.estimate_columns(time_s, &temperature_k, &x))
}
