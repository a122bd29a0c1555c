//! Kinetic forward model
//!
//! Integrates the densification law
//!
//! ```text
//! dx/dt = A · exp(−Ea / (R · T(t))) · (1 − x)^m · x^n
//! ```
//!
//! on a caller supplied time grid. `x` is the relative density as a fraction,
//! `Ea` is given in kJ/mol and `T(t)` is either constant or linearly
//! interpolated between samples taken on the same grid.

mod problem;
pub mod synthetic;

use diffsol::{
    error::{DiffsolError, OdeSolverError},
    ode_solver::method::OdeSolverMethod,
    OdeBuilder, OdeSolverStopReason,
};
use serde::{Deserialize, Serialize};

use crate::data::Experiment;
use crate::error::SinterError;
use crate::kinetics::{KineticParameters, GAS_CONSTANT};

pub use synthetic::SyntheticExperiment;

/// Distance kept from the singular boundaries `x = 0` and `x = 1`
pub const X0_EPSILON: f64 = 1e-3;

/// Exponents of the sintering law `(1 − x)^exponent · x^order`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SinteringLaw {
    /// Exponent `m` on the remaining porosity `(1 − x)`
    pub exponent: f64,
    /// Densification order `n` on the current density `x`
    pub order: f64,
}

impl Default for SinteringLaw {
    fn default() -> Self {
        SinteringLaw {
            exponent: 1.0,
            order: 0.0,
        }
    }
}

impl SinteringLaw {
    /// First order law, `(1 − x)^m` with no density term
    pub fn new(exponent: f64) -> Self {
        SinteringLaw {
            exponent,
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Move `x0` off a boundary where the law would stall or diverge
    pub fn regularize_initial(&self, x0: f64) -> f64 {
        if self.order > 0.0 && x0 == 0.0 {
            X0_EPSILON
        } else if self.exponent <= 0.0 && x0 >= 1.0 {
            1.0 - X0_EPSILON
        } else {
            x0
        }
    }

    /// Density dependent factor `(1 − x)^m · x^n`
    #[inline]
    pub fn factor(&self, x: f64) -> f64 {
        let floor = if self.exponent > 0.0 { 0.0 } else { X0_EPSILON };
        let porosity = (1.0 - x).max(floor);
        let density = if self.order != 0.0 { x.max(0.0).powf(self.order) } else { 1.0 };
        porosity.powf(self.exponent) * density
    }

    /// `d/dx` of [SinteringLaw::factor], zero where a clamp is active
    pub fn factor_derivative(&self, x: f64) -> f64 {
        let floor = if self.exponent > 0.0 { 0.0 } else { X0_EPSILON };
        let porosity = (1.0 - x).max(floor);
        let density = if self.order != 0.0 { x.max(0.0).powf(self.order) } else { 1.0 };

        let d_porosity = if 1.0 - x > floor && self.exponent != 0.0 {
            -self.exponent * porosity.powf(self.exponent - 1.0)
        } else {
            0.0
        };
        let d_density = if self.order != 0.0 && x > 0.0 {
            self.order * x.powf(self.order - 1.0)
        } else {
            0.0
        };
        d_porosity * density + porosity.powf(self.exponent) * d_density
    }
}

/// Temperature history in Kelvin
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TemperatureProfile {
    /// The same temperature at every time
    Constant(f64),
    /// One temperature per point of the time grid
    Sampled(Vec<f64>),
}

impl TemperatureProfile {
    /// Build a sampled profile from Celsius readings
    pub fn from_celsius(temperature_c: &[f64]) -> Self {
        TemperatureProfile::Sampled(
            temperature_c
                .iter()
                .map(|t| t + crate::data::CELSIUS_TO_KELVIN)
                .collect(),
        )
    }

    fn validate(&self, grid_len: usize) -> Result<(), SinterError> {
        let valid = |t: &f64| t.is_finite() && *t > 0.0;
        match self {
            TemperatureProfile::Constant(t) if !valid(t) => Err(SinterError::invalid(format!(
                "temperature must be positive and finite, got {} K",
                t
            ))),
            TemperatureProfile::Sampled(values) if values.len() != grid_len => {
                Err(SinterError::invalid(format!(
                    "temperature profile has {} samples, time grid has {}",
                    values.len(),
                    grid_len
                )))
            }
            TemperatureProfile::Sampled(values) if !values.iter().all(valid) => Err(
                SinterError::invalid("temperature profile contains non-positive or non-finite values"),
            ),
            _ => Ok(()),
        }
    }
}

/// Piecewise linear view of a profile on its grid, held flat beyond the ends
struct Interpolant<'a> {
    times: &'a [f64],
    profile: &'a TemperatureProfile,
}

impl Interpolant<'_> {
    #[inline]
    fn at(&self, time: f64) -> f64 {
        let values = match self.profile {
            TemperatureProfile::Constant(t) => return *t,
            TemperatureProfile::Sampled(values) => values,
        };
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return values[0];
        }
        if time >= self.times[last] {
            return values[last];
        }
        let upper = self.times.partition_point(|&t| t <= time).min(last);
        let lower = upper - 1;
        let slope = (values[upper] - values[lower]) / (self.times[upper] - self.times[lower]);
        values[lower] + slope * (time - self.times[lower])
    }
}

/// Tolerances and limits of the adaptive integrator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Initial step size handed to the solver
    pub h0: f64,
    /// Total number of solver steps over the whole grid
    pub max_steps: usize,
    /// Gas constant in J/(mol·K)
    pub gas_constant: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-8,
            atol: 1e-12,
            h0: 1e-3,
            max_steps: 100_000,
            gas_constant: GAS_CONSTANT,
        }
    }
}

impl SolverOptions {
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_gas_constant(mut self, gas_constant: f64) -> Self {
        self.gas_constant = gas_constant;
        self
    }
}

fn validate_grid(time_grid: &[f64]) -> Result<(), SinterError> {
    if time_grid.len() < 2 {
        return Err(SinterError::insufficient(format!(
            "time grid needs at least 2 points, got {}",
            time_grid.len()
        )));
    }
    if !time_grid.iter().all(|t| t.is_finite()) {
        return Err(SinterError::invalid("time grid contains non-finite values"));
    }
    if time_grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SinterError::invalid("time grid must be strictly increasing"));
    }
    Ok(())
}

/// Integrate the densification law and sample it on `time_grid`
///
/// Returns the density fraction at every grid point; the first entry is the
/// (possibly regularized) initial density `x0`.
///
/// # Errors
///
/// * [SinterError::InsufficientData] for a grid with fewer than two points
/// * [SinterError::InvalidInput] for a non-increasing grid, mismatched or
///   non-physical temperatures, non-finite parameters or `x0 ∉ [0, 1)`
/// * [SinterError::Integration] if the step controller fails or the solution
///   becomes non-finite
pub fn integrate(
    params: &KineticParameters,
    time_grid: &[f64],
    profile: &TemperatureProfile,
    x0: f64,
    law: &SinteringLaw,
    options: &SolverOptions,
) -> Result<Vec<f64>, SinterError> {
    validate_grid(time_grid)?;
    profile.validate(time_grid.len())?;
    if !(params.ea_kj.is_finite() && params.a.is_finite() && params.a >= 0.0) {
        return Err(SinterError::invalid(format!(
            "kinetic parameters must be finite with A >= 0, got {}",
            params
        )));
    }
    if !(0.0..1.0).contains(&x0) {
        return Err(SinterError::invalid(format!(
            "initial density must lie in [0, 1), got {}",
            x0
        )));
    }

    let x0 = law.regularize_initial(x0);
    let ode = problem::SinteringOde::new(params, time_grid, profile, law, options.gas_constant, x0);
    let problem = OdeBuilder::<nalgebra::DMatrix<f64>>::new()
        .atol(vec![options.atol])
        .rtol(options.rtol)
        .t0(time_grid[0])
        .h0(options.h0)
        .p(vec![params.ea_kj, params.a])
        .build_from_eqn(ode)?;
    let mut solver = problem.bdf::<diffsol::NalgebraLU<f64>>()?;

    let mut steps = 0usize;
    let mut solution = Vec::with_capacity(time_grid.len());
    solution.push(x0);
    for &stop in &time_grid[1..] {
        match solver.set_stop_time(stop) {
            Ok(_) => loop {
                if steps >= options.max_steps {
                    return Err(SinterError::integration(format!(
                        "maximum number of steps ({}) reached at t = {}",
                        options.max_steps,
                        solver.state().t
                    )));
                }
                steps += 1;
                match solver.step() {
                    Ok(OdeSolverStopReason::InternalTimestep) => continue,
                    Ok(OdeSolverStopReason::TstopReached) => break,
                    Ok(reason) => {
                        return Err(SinterError::integration(format!(
                            "solver stopped early ({:?}) at t = {}",
                            reason,
                            solver.state().t
                        )))
                    }
                    Err(e) => return Err(e.into()),
                }
            },
            Err(DiffsolError::OdeSolverError(OdeSolverError::StopTimeAtCurrentTime)) => {}
            Err(e) => return Err(e.into()),
        }

        let x = solver.state().y[0];
        if !x.is_finite() {
            return Err(SinterError::integration(format!(
                "non-finite density at t = {}",
                stop
            )));
        }
        solution.push(x);
    }
    Ok(solution)
}

/// Closed form of the first order law at constant temperature
///
/// `x(t) = 1 − (1 − x0) · exp(−k · (t − t0))`, exact when `m = 1` and `n = 0`.
pub fn closed_form(
    params: &KineticParameters,
    time_grid: &[f64],
    temperature_k: f64,
    x0: f64,
    gas_constant: f64,
) -> Vec<f64> {
    let k = params.rate(temperature_k, gas_constant);
    let t0 = time_grid.first().copied().unwrap_or(0.0);
    time_grid
        .iter()
        .map(|t| 1.0 - (1.0 - x0) * (-k * (t - t0)).exp())
        .collect()
}

/// Predicted density in percent on the experiment's own time and temperature grid
///
/// The integration starts from the first measured density. Repeated time
/// stamps receive the same prediction.
pub fn predict(
    experiment: &Experiment,
    params: &KineticParameters,
    law: &SinteringLaw,
    options: &SolverOptions,
) -> Result<Vec<f64>, SinterError> {
    let samples = experiment.samples();
    let mut grid = Vec::with_capacity(samples.len());
    let mut temps = Vec::with_capacity(samples.len());
    let mut slot = Vec::with_capacity(samples.len());
    for sample in samples {
        if grid.last() != Some(&sample.time_s) {
            grid.push(sample.time_s);
            temps.push(sample.temperature_k());
        }
        slot.push(grid.len() - 1);
    }
    if grid.len() < 2 {
        return Err(SinterError::insufficient(format!(
            "experiment '{}' spans a single time point",
            experiment.id()
        )));
    }

    let x0 = samples[0].density_fraction().min(1.0 - X0_EPSILON);
    let profile = TemperatureProfile::Sampled(temps);
    let fractions = integrate(params, &grid, &profile, x0, law, options)?;
    Ok(slot.into_iter().map(|i| fractions[i] * 100.0).collect())
}
