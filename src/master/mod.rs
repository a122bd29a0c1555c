//! Master curves by Arrhenius time–temperature superposition
//!
//! Every sample time is rescaled by the shift factor
//!
//! ```text
//! a_T = exp((Ea · 1000 / R) · (1/T − 1/T_ref))
//! ```
//!
//! where `T_ref` is the mean sample temperature of the experiment in Kelvin.
//! Densities are carried over unchanged, one output point per sample.

use serde::{Deserialize, Serialize};

use crate::data::Experiment;
use crate::error::SinterError;
use crate::kinetics::{fit, FitOptions, RateEstimator, GAS_CONSTANT};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MasterCurvePoint {
    pub master_time_s: f64,
    pub master_density_pct: f64,
}

/// The shifted curve of one experiment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MasterCurve {
    pub id: String,
    /// Activation energy used for the shift, kJ/mol
    pub ea_kj: f64,
    pub reference_temperature_k: f64,
    pub points: Vec<MasterCurvePoint>,
}

impl MasterCurve {
    pub fn master_times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.master_time_s).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MasterCurveOptions {
    /// Estimator used when Ea has to be fitted from the data
    pub rate_estimator: RateEstimator,
    /// Gas constant in J/(mol·K)
    pub gas_constant: f64,
}

impl Default for MasterCurveOptions {
    fn default() -> Self {
        MasterCurveOptions {
            rate_estimator: RateEstimator::default(),
            gas_constant: GAS_CONSTANT,
        }
    }
}

impl MasterCurveOptions {
    pub fn with_rate_estimator(mut self, estimator: RateEstimator) -> Self {
        self.rate_estimator = estimator;
        self
    }

    pub fn with_gas_constant(mut self, gas_constant: f64) -> Self {
        self.gas_constant = gas_constant;
        self
    }

    fn fit_options(&self) -> FitOptions {
        FitOptions::default()
            .with_rate_estimator(self.rate_estimator)
            .with_gas_constant(self.gas_constant)
    }
}

/// Shift one experiment onto its own reference temperature
///
/// When `ea_kj` is `None` the activation energy is fitted from this
/// experiment alone.
///
/// # Errors
///
/// * [SinterError::InvalidInput] if `ea_kj` is omitted and fewer than two
///   valid rate points remain, or if a supplied `ea_kj` is not finite
/// * any error of [fit] when Ea has to be estimated
pub fn build(
    experiment: &Experiment,
    ea_kj: Option<f64>,
    options: &MasterCurveOptions,
) -> Result<MasterCurve, SinterError> {
    let ea_kj = match ea_kj {
        Some(ea) if ea.is_finite() => ea,
        Some(ea) => {
            return Err(SinterError::invalid(format!(
                "activation energy must be finite, got {}",
                ea
            )))
        }
        None => estimate_ea(std::slice::from_ref(experiment), options)?,
    };

    let reference = experiment.mean_temperature_k();
    let scale = ea_kj * 1000.0 / options.gas_constant;
    let points = experiment
        .samples()
        .iter()
        .map(|sample| {
            let shift = (scale * (1.0 / sample.temperature_k() - 1.0 / reference)).exp();
            MasterCurvePoint {
                master_time_s: sample.time_s * shift,
                master_density_pct: sample.density_pct,
            }
        })
        .collect();

    Ok(MasterCurve {
        id: experiment.id().to_string(),
        ea_kj,
        reference_temperature_k: reference,
        points,
    })
}

/// Master curves of several experiments sharing one activation energy
///
/// Ea is fitted over all experiments together unless supplied; each
/// experiment is shifted to its own mean temperature.
pub fn build_all(
    experiments: &[Experiment],
    ea_kj: Option<f64>,
    options: &MasterCurveOptions,
) -> Result<Vec<MasterCurve>, SinterError> {
    if experiments.is_empty() {
        return Err(SinterError::insufficient("no experiments supplied"));
    }
    let ea_kj = match ea_kj {
        Some(ea) => ea,
        None => estimate_ea(experiments, options)?,
    };
    experiments
        .iter()
        .map(|experiment| build(experiment, Some(ea_kj), options))
        .collect()
}

fn estimate_ea(experiments: &[Experiment], options: &MasterCurveOptions) -> Result<f64, SinterError> {
    let valid = options.rate_estimator.estimate_pooled(experiments).len();
    if valid < 2 {
        return Err(SinterError::invalid(format!(
            "{} valid rate points, at least 2 are needed to estimate Ea",
            valid
        )));
    }
    let result = fit(experiments, &options.fit_options())?;
    tracing::debug!(ea_kj = result.params.ea_kj, "estimated Ea for master curve");
    Ok(result.params.ea_kj)
}

/// One point of a work-of-sintering curve
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LogThetaPoint {
    /// `log10 Θ`, see [log_theta]
    pub log_theta: f64,
    pub density_pct: f64,
    pub time_s: f64,
}

/// Work of sintering `Θ(t) = ∫₀ᵗ (1/T) · exp(−Ea / (R · T)) dt`, on a log10 scale
///
/// The integral is a cumulative trapezoid over the samples. `Θ = 0` (the
/// first sample) is replaced by the smallest positive double before the
/// logarithm.
pub fn log_theta(
    experiment: &Experiment,
    ea_kj: f64,
    gas_constant: f64,
) -> Result<Vec<LogThetaPoint>, SinterError> {
    if experiment.len() < 2 {
        return Err(SinterError::insufficient(
            "at least 2 samples are required for integration",
        ));
    }
    let ea_j = ea_kj * 1000.0;
    let integrand = |t_k: f64| (1.0 / t_k) * (-ea_j / (gas_constant * t_k)).exp();

    let samples = experiment.samples();
    let mut theta = 0.0;
    let mut curve = Vec::with_capacity(samples.len());
    for (i, sample) in samples.iter().enumerate() {
        if i > 0 {
            let previous = &samples[i - 1];
            theta += 0.5
                * (sample.time_s - previous.time_s)
                * (integrand(sample.temperature_k()) + integrand(previous.temperature_k()));
        }
        let safe = if theta == 0.0 { f64::MIN_POSITIVE } else { theta };
        curve.push(LogThetaPoint {
            log_theta: safe.log10(),
            density_pct: sample.density_pct,
            time_s: sample.time_s,
        });
    }
    Ok(curve)
}
