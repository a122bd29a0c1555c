use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::data::{Experiment, Sample, CELSIUS_TO_KELVIN};
use crate::error::SinterError;
use crate::kinetics::KineticParameters;

use super::{integrate, SinteringLaw, SolverOptions, TemperatureProfile};

/// Generator for experiments that follow the forward model exactly, optionally with noise
///
/// The temperature is a linear ramp in °C from the first to the last grid point.
///
/// # Example
///
/// ```
/// use sinterfit::kinetics::KineticParameters;
/// use sinterfit::simulator::SyntheticExperiment;
///
/// let times: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
/// let experiment = SyntheticExperiment::new(KineticParameters::new(60.0, 2.0), times)
///     .with_ramp(1000.0, 1050.0)
///     .generate("ramp")
///     .unwrap();
/// assert_eq!(experiment.len(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticExperiment {
    params: KineticParameters,
    times: Vec<f64>,
    start_c: f64,
    end_c: f64,
    x0: f64,
    law: SinteringLaw,
    noise: Option<(f64, u64)>,
    options: SolverOptions,
}

impl SyntheticExperiment {
    pub fn new(params: KineticParameters, times: Vec<f64>) -> Self {
        SyntheticExperiment {
            params,
            times,
            start_c: 1000.0,
            end_c: 1000.0,
            x0: 0.0,
            law: SinteringLaw::default(),
            noise: None,
            options: SolverOptions::default(),
        }
    }

    pub fn with_ramp(mut self, start_c: f64, end_c: f64) -> Self {
        self.start_c = start_c;
        self.end_c = end_c;
        self
    }

    pub fn isothermal(self, temperature_c: f64) -> Self {
        self.with_ramp(temperature_c, temperature_c)
    }

    pub fn with_initial_density(mut self, x0: f64) -> Self {
        self.x0 = x0;
        self
    }

    pub fn with_law(mut self, law: SinteringLaw) -> Self {
        self.law = law;
        self
    }

    /// Add Gaussian noise with standard deviation `sd_pct` (density percent), seeded
    pub fn with_noise(mut self, sd_pct: f64, seed: u64) -> Self {
        self.noise = Some((sd_pct, seed));
        self
    }

    pub fn with_solver_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Temperatures in °C on the time grid
    pub fn temperatures_c(&self) -> Vec<f64> {
        let n = self.times.len();
        if n < 2 {
            return vec![self.start_c; n];
        }
        let step = (self.end_c - self.start_c) / (n - 1) as f64;
        (0..n).map(|i| self.start_c + step * i as f64).collect()
    }

    pub fn generate(&self, id: impl Into<String>) -> Result<Experiment, SinterError> {
        let temperature_c = self.temperatures_c();
        let profile = TemperatureProfile::Sampled(
            temperature_c.iter().map(|t| t + CELSIUS_TO_KELVIN).collect(),
        );
        let fractions = integrate(
            &self.params,
            &self.times,
            &profile,
            self.x0,
            &self.law,
            &self.options,
        )?;

        let mut density: Vec<f64> = fractions.iter().map(|x| (x * 100.0).clamp(0.0, 100.0)).collect();
        if let Some((sd, seed)) = self.noise {
            let normal = Normal::new(0.0, sd).map_err(|e| {
                SinterError::invalid(format!("invalid noise level {}: {}", sd, e))
            })?;
            let mut rng = StdRng::seed_from_u64(seed);
            for value in density.iter_mut() {
                *value = (*value + normal.sample(&mut rng)).clamp(0.0, 100.0);
            }
        }

        let samples = self
            .times
            .iter()
            .zip(temperature_c)
            .zip(density)
            .map(|((&t, temp), dens)| Sample::new(t, temp, dens))
            .collect();
        Experiment::new(id, samples)
    }
}
