//! Arrhenius parameter estimation
//!
//! Rate points from every experiment are pooled and `ln k` is regressed on
//! `1/T`. An optional second stage refines `(ln A, Ea)` with Nelder–Mead,
//! either on the log-rates themselves or on the densities predicted by the
//! forward model. A refinement that fails or does not lower its cost leaves
//! the linear estimate in place.

use argmin::{
    core::{CostFunction, Error, Executor},
    solver::neldermead::NelderMead,
};
use serde::{Deserialize, Serialize};

use crate::data::Experiment;
use crate::error::SinterError;
use crate::simulator::{predict, SinteringLaw, SolverOptions};

use super::{linear_regression, KineticParameters, RateEstimator, RatePoints, GAS_CONSTANT};

/// Second stage applied after the linear Arrhenius regression
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refinement {
    /// Keep the linear estimate
    #[default]
    None,
    /// Least squares on `ln k = ln A − Ea / (R · T)`
    LogRate,
    /// Least squares between measured densities and the forward model
    Density,
}

/// Options for [fit]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FitOptions {
    pub rate_estimator: RateEstimator,
    pub refinement: Refinement,
    /// Gas constant in J/(mol·K)
    pub gas_constant: f64,
    /// Iteration limit of the Nelder–Mead refinement
    pub max_iters: u64,
    /// Standard deviation tolerance of the simplex costs
    pub sd_tolerance: f64,
    /// Sintering law used by [Refinement::Density]
    pub law: SinteringLaw,
    /// Integrator settings used by [Refinement::Density]
    pub solver: SolverOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            rate_estimator: RateEstimator::default(),
            refinement: Refinement::default(),
            gas_constant: GAS_CONSTANT,
            max_iters: 200,
            sd_tolerance: 1e-10,
            law: SinteringLaw::default(),
            solver: SolverOptions::default(),
        }
    }
}

impl FitOptions {
    pub fn with_rate_estimator(mut self, estimator: RateEstimator) -> Self {
        self.rate_estimator = estimator;
        self
    }

    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinement = refinement;
        self
    }

    pub fn with_gas_constant(mut self, gas_constant: f64) -> Self {
        self.gas_constant = gas_constant;
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_law(mut self, law: SinteringLaw) -> Self {
        self.law = law;
        self
    }
}

/// Result of [fit]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KineticFit {
    pub params: KineticParameters,
    /// Slope of the linear stage, `−Ea · 1000 / R`
    pub slope: f64,
    /// Intercept of the linear stage, `ln A`
    pub intercept: f64,
    pub r_squared: f64,
    /// Number of pooled rate points
    pub n_points: usize,
    /// Standard error of Ea in kJ/mol from the linear stage
    pub ea_std_error: f64,
    /// Standard error of ln A from the linear stage
    pub ln_a_std_error: f64,
    /// `ln k` residuals of the final parameters, in pooled order
    pub residuals: Vec<f64>,
    /// Refinement that produced `params`, [Refinement::None] if the linear estimate stands
    pub refinement: Refinement,
}

/// Estimate `(Ea, A)` from one or more experiments
///
/// # Errors
///
/// [SinterError::InsufficientData] when fewer than two valid rate points are
/// pooled or when all valid points share a single temperature.
///
/// # Example
///
/// ```
/// use sinterfit::kinetics::{fit, FitOptions, KineticParameters};
/// use sinterfit::simulator::SyntheticExperiment;
///
/// let truth = KineticParameters::new(80.0, 10.0);
/// let times: Vec<f64> = (0..10).map(|i| i as f64 * 20.0).collect();
/// let experiments: Vec<_> = [1000.0, 1050.0, 1100.0]
///     .iter()
///     .map(|t| {
///         SyntheticExperiment::new(truth, times.clone())
///             .isothermal(*t)
///             .generate(format!("iso_{}", t))
///             .unwrap()
///     })
///     .collect();
///
/// let result = fit(&experiments, &FitOptions::default()).unwrap();
/// assert!((result.params.ea_kj - 80.0).abs() < 1e-3);
/// ```
pub fn fit(experiments: &[Experiment], options: &FitOptions) -> Result<KineticFit, SinterError> {
    let points = options.rate_estimator.estimate_pooled(experiments);
    tracing::debug!(
        experiments = experiments.len(),
        points = points.len(),
        "pooled rate points"
    );
    if points.len() < 2 {
        return Err(SinterError::insufficient(format!(
            "{} valid rate points pooled from {} experiments, at least 2 are required",
            points.len(),
            experiments.len()
        )));
    }

    let inverse_t = points.inverse_temperature();
    let line = linear_regression(&inverse_t, &points.ln_rate).ok_or_else(|| {
        SinterError::insufficient("all valid rate points share a single temperature")
    })?;
    let linear = KineticParameters::from_arrhenius_line(line.slope, line.intercept, options.gas_constant);
    if !linear.is_finite() {
        return Err(SinterError::insufficient(format!(
            "linear regression produced non-finite parameters ({})",
            linear
        )));
    }
    tracing::debug!(slope = line.slope, intercept = line.intercept, "arrhenius regression");

    let (params, refinement) = match options.refinement {
        Refinement::None => (linear, Refinement::None),
        Refinement::LogRate => {
            let cost = LogRateCost {
                inverse_t: &inverse_t,
                ln_rate: &points.ln_rate,
                gas_constant: options.gas_constant,
            };
            refine(cost, linear, Refinement::LogRate, options)
        }
        Refinement::Density => {
            let mut solver = options.solver.clone();
            solver.gas_constant = options.gas_constant;
            let cost = DensityCost {
                experiments,
                law: &options.law,
                solver: &solver,
            };
            refine(cost, linear, Refinement::Density, options)
        }
    };

    Ok(KineticFit {
        params,
        slope: line.slope,
        intercept: line.intercept,
        r_squared: line.r_squared,
        n_points: line.n,
        ea_std_error: line.slope_std_error * options.gas_constant / 1000.0,
        ln_a_std_error: line.intercept_std_error,
        residuals: log_rate_residuals(&points, &params, options.gas_constant),
        refinement,
    })
}

/// [fit] without the diagnostics, `None` on any failure
///
/// Used where degenerate inputs are expected and skipped, such as bootstrap resamples.
pub fn try_fit(experiments: &[Experiment], options: &FitOptions) -> Option<KineticParameters> {
    fit(experiments, options)
        .ok()
        .map(|result| result.params)
        .filter(KineticParameters::is_finite)
}

fn log_rate_residuals(points: &RatePoints, params: &KineticParameters, gas_constant: f64) -> Vec<f64> {
    points
        .temperature_k
        .iter()
        .zip(&points.ln_rate)
        .map(|(t, y)| y - params.ln_rate(*t, gas_constant))
        .collect()
}

/// Map the search vector `[ln A, Ea]` back to parameters, rejecting negative Ea
fn decode(param: &[f64]) -> Option<KineticParameters> {
    let (ln_a, ea_kj) = (param[0], param[1]);
    if !(ln_a.is_finite() && ea_kj.is_finite()) || ea_kj < 0.0 {
        return None;
    }
    Some(KineticParameters::new(ea_kj, ln_a.exp()))
}

struct LogRateCost<'a> {
    inverse_t: &'a [f64],
    ln_rate: &'a [f64],
    gas_constant: f64,
}

impl CostFunction for LogRateCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let (ln_a, ea_kj) = (param[0], param[1]);
        if !(ln_a.is_finite() && ea_kj.is_finite()) || ea_kj < 0.0 {
            return Ok(f64::INFINITY);
        }
        let slope = -ea_kj * 1000.0 / self.gas_constant;
        Ok(self
            .inverse_t
            .iter()
            .zip(self.ln_rate)
            .map(|(x, y)| (y - (ln_a + slope * x)).powi(2))
            .sum())
    }
}

struct DensityCost<'a> {
    experiments: &'a [Experiment],
    law: &'a SinteringLaw,
    solver: &'a SolverOptions,
}

impl CostFunction for DensityCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let params = match decode(param) {
            Some(params) => params,
            None => return Ok(f64::INFINITY),
        };
        let mut sum = 0.0;
        for experiment in self.experiments {
            let predicted = match predict(experiment, &params, self.law, self.solver) {
                Ok(predicted) => predicted,
                Err(_) => return Ok(f64::INFINITY),
            };
            sum += experiment
                .samples()
                .iter()
                .zip(predicted)
                .map(|(s, p)| ((s.density_pct - p) / 100.0).powi(2))
                .sum::<f64>();
        }
        Ok(sum)
    }
}

/// Run Nelder–Mead from the linear estimate, keeping it unless the cost improves
fn refine<C>(
    cost: C,
    linear: KineticParameters,
    kind: Refinement,
    options: &FitOptions,
) -> (KineticParameters, Refinement)
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    let start = vec![linear.a.ln(), linear.ea_kj];
    let start_cost = match cost.cost(&start) {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::warn!(?kind, "refinement cost is not finite at the linear estimate");
            return (linear, Refinement::None);
        }
    };

    match run_nelder_mead(cost, &start, options) {
        Ok((best, best_cost)) if best_cost < start_cost => match decode(&best) {
            Some(params) => {
                tracing::debug!(?kind, start_cost, best_cost, "refinement accepted");
                (params, kind)
            }
            None => (linear, Refinement::None),
        },
        Ok((_, best_cost)) => {
            tracing::warn!(?kind, start_cost, best_cost, "refinement did not improve the linear fit");
            (linear, Refinement::None)
        }
        Err(e) => {
            tracing::warn!(?kind, error = %e, "refinement failed, keeping linear fit");
            (linear, Refinement::None)
        }
    }
}

fn run_nelder_mead<C>(cost: C, start: &[f64], options: &FitOptions) -> Result<(Vec<f64>, f64), Error>
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    let simplex = create_initial_simplex(start);
    let solver: NelderMead<Vec<f64>, f64> =
        NelderMead::new(simplex).with_sd_tolerance(options.sd_tolerance)?;
    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(options.max_iters))
        .run()?;
    let best_cost = res.state.best_cost;
    let best = res
        .state
        .best_param
        .ok_or_else(|| Error::msg("Nelder-Mead returned no parameters"))?;
    Ok((best, best_cost))
}

fn create_initial_simplex(initial_point: &[f64]) -> Vec<Vec<f64>> {
    let perturbation_percentage = 0.008;
    let mut vertices = vec![initial_point.to_vec()];
    for i in 0..initial_point.len() {
        let perturbation = if initial_point[i] == 0.0 {
            0.00025
        } else {
            perturbation_percentage * initial_point[i]
        };
        let mut vertex = initial_point.to_vec();
        vertex[i] += perturbation;
        vertices.push(vertex);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SyntheticExperiment;
    use approx::assert_relative_eq;

    fn isothermal_set(truth: KineticParameters) -> Vec<Experiment> {
        let times: Vec<f64> = (0..12).map(|i| i as f64 * 15.0).collect();
        [1000.0, 1040.0, 1080.0, 1120.0]
            .iter()
            .map(|t| {
                SyntheticExperiment::new(truth, times.clone())
                    .isothermal(*t)
                    .generate(format!("iso_{}", t))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_isothermal_set_is_recovered() {
        let truth = KineticParameters::new(90.0, 30.0);
        let result = fit(&isothermal_set(truth), &FitOptions::default()).unwrap();
        assert_relative_eq!(result.params.ea_kj, 90.0, max_relative = 1e-4);
        assert_relative_eq!(result.params.a, 30.0, max_relative = 1e-3);
        assert!(result.r_squared > 0.9999);
        assert_eq!(result.refinement, Refinement::None);
        assert_eq!(result.residuals.len(), result.n_points);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = isothermal_set(KineticParameters::new(70.0, 20.0));
        let a = fit(&data, &FitOptions::default()).unwrap();
        let b = fit(&data, &FitOptions::default()).unwrap();
        assert_eq!(a.params.ea_kj.to_bits(), b.params.ea_kj.to_bits());
        assert_eq!(a.params.a.to_bits(), b.params.a.to_bits());
    }

    #[test]
    fn test_no_valid_points_is_insufficient() {
        let flat = Experiment::from_columns("flat", &[0.0, 1.0, 2.0], &[1000.0; 3], &[0.0; 3])
            .unwrap();
        let err = fit(&[flat.clone()], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, SinterError::InsufficientData { .. }));
        assert!(try_fit(&[flat], &FitOptions::default()).is_none());
    }

    #[test]
    fn test_single_temperature_is_insufficient() {
        let data = isothermal_set(KineticParameters::new(70.0, 20.0));
        let err = fit(&data[..1], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, SinterError::InsufficientData { .. }));
    }

    #[test]
    fn test_log_rate_refinement_keeps_optimum() {
        let data = isothermal_set(KineticParameters::new(90.0, 30.0));
        let options = FitOptions::default().with_refinement(Refinement::LogRate);
        let linear = fit(&data, &FitOptions::default()).unwrap();
        let refined = fit(&data, &options).unwrap();
        assert_relative_eq!(refined.params.ea_kj, linear.params.ea_kj, max_relative = 1e-6);
    }

    #[test]
    fn test_density_refinement_stays_close_to_truth() {
        let truth = KineticParameters::new(90.0, 30.0);
        let data = isothermal_set(truth);
        let options = FitOptions::default()
            .with_refinement(Refinement::Density)
            .with_max_iters(50);
        let result = fit(&data, &options).unwrap();
        assert_relative_eq!(result.params.ea_kj, 90.0, max_relative = 1e-2);
    }

    #[test]
    fn test_initial_simplex() {
        let simplex = create_initial_simplex(&[0.0, 100.0]);
        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[1], vec![0.00025, 100.0]);
        assert_relative_eq!(simplex[2][1], 100.8);
    }
}
