use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SinterError;

/// Offset between the Celsius and Kelvin scales
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// A single measurement of a sintering run
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Elapsed time in seconds
    pub time_s: f64,
    /// Furnace or specimen temperature in degrees Celsius
    pub temperature_c: f64,
    /// Relative density as a percentage of full density
    pub density_pct: f64,
}

impl Sample {
    pub fn new(time_s: f64, temperature_c: f64, density_pct: f64) -> Self {
        Sample {
            time_s,
            temperature_c,
            density_pct,
        }
    }

    /// Absolute temperature in Kelvin
    #[inline]
    pub fn temperature_k(&self) -> f64 {
        self.temperature_c + CELSIUS_TO_KELVIN
    }

    /// Relative density as a fraction in `[0, 1]`
    #[inline]
    pub fn density_fraction(&self) -> f64 {
        self.density_pct / 100.0
    }
}

/// A time-ordered densification series recorded during one sintering run
///
/// An [Experiment] is validated on construction and never mutated afterwards;
/// every transformation (refinement, smoothing) returns a new experiment.
///
/// # Examples
///
/// ```
/// use sinterfit::data::Experiment;
///
/// let experiment = Experiment::builder("run_1")
///     .sample(0.0, 1000.0, 55.0)
///     .sample(60.0, 1010.0, 61.0)
///     .sample(120.0, 1020.0, 66.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(experiment.len(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "ExperimentData")]
pub struct Experiment {
    id: String,
    samples: Vec<Sample>,
}

/// Unvalidated wire form of an [Experiment]
#[derive(Deserialize)]
struct ExperimentData {
    id: String,
    samples: Vec<Sample>,
}

impl TryFrom<ExperimentData> for Experiment {
    type Error = SinterError;

    fn try_from(data: ExperimentData) -> Result<Self, Self::Error> {
        Experiment::new(data.id, data.samples)
    }
}

impl Experiment {
    /// Construct an experiment from samples sorted by time
    ///
    /// # Errors
    ///
    /// * [SinterError::InsufficientData] if fewer than two samples are given
    /// * [SinterError::InvalidInput] if a value is non-finite, a time is negative,
    ///   time decreases, or a density lies outside `[0, 100]`
    pub fn new(id: impl Into<String>, samples: Vec<Sample>) -> Result<Self, SinterError> {
        let id = id.into();
        if samples.len() < 2 {
            return Err(SinterError::insufficient(format!(
                "experiment '{}' has {} samples, at least 2 are required",
                id,
                samples.len()
            )));
        }

        let mut previous_time = f64::NEG_INFINITY;
        for (index, sample) in samples.iter().enumerate() {
            if !(sample.time_s.is_finite()
                && sample.temperature_c.is_finite()
                && sample.density_pct.is_finite())
            {
                return Err(SinterError::invalid(format!(
                    "experiment '{}': non-finite value in sample {}",
                    id, index
                )));
            }
            if sample.time_s < 0.0 {
                return Err(SinterError::invalid(format!(
                    "experiment '{}': negative time {} in sample {}",
                    id, sample.time_s, index
                )));
            }
            if sample.time_s < previous_time {
                return Err(SinterError::invalid(format!(
                    "experiment '{}': time decreases at sample {}",
                    id, index
                )));
            }
            if !(0.0..=100.0).contains(&sample.density_pct) {
                return Err(SinterError::invalid(format!(
                    "experiment '{}': density {} % outside [0, 100] in sample {}",
                    id, sample.density_pct, index
                )));
            }
            if sample.temperature_k() <= 0.0 {
                return Err(SinterError::invalid(format!(
                    "experiment '{}': temperature {} °C is below absolute zero",
                    id, sample.temperature_c
                )));
            }
            previous_time = sample.time_s;
        }

        Ok(Experiment { id, samples })
    }

    /// Construct an experiment from columnar arrays, as delivered by web or CSV adapters
    pub fn from_columns(
        id: impl Into<String>,
        time_s: &[f64],
        temperature_c: &[f64],
        density_pct: &[f64],
    ) -> Result<Self, SinterError> {
        if time_s.len() != temperature_c.len() || time_s.len() != density_pct.len() {
            return Err(SinterError::invalid(format!(
                "column lengths differ: time={}, temperature={}, density={}",
                time_s.len(),
                temperature_c.len(),
                density_pct.len()
            )));
        }
        let samples = time_s
            .iter()
            .zip(temperature_c)
            .zip(density_pct)
            .map(|((&t, &temp), &dens)| Sample::new(t, temp, dens))
            .collect();
        Experiment::new(id, samples)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a validated experiment, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }

    pub fn temperatures_c(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.temperature_c).collect()
    }

    pub fn temperatures_k(&self) -> Vec<f64> {
        self.samples.iter().map(Sample::temperature_k).collect()
    }

    pub fn densities_pct(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.density_pct).collect()
    }

    pub fn density_fractions(&self) -> Vec<f64> {
        self.samples.iter().map(Sample::density_fraction).collect()
    }

    /// Arithmetic mean of the sample temperatures in Kelvin
    pub fn mean_temperature_k(&self) -> f64 {
        self.samples.iter().map(Sample::temperature_k).sum::<f64>() / self.samples.len() as f64
    }

    /// True when every sample was recorded at the same temperature
    pub fn is_isothermal(&self) -> bool {
        match self.samples.first() {
            Some(first) => self
                .samples
                .iter()
                .all(|s| s.temperature_c == first.temperature_c),
            None => true,
        }
    }

    /// Return a copy with a different identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Experiment {} ({} samples)", self.id, self.samples.len())?;
        for sample in &self.samples {
            writeln!(
                f,
                "  t={:>10.3} s  T={:>8.2} °C  rho={:>6.2} %",
                sample.time_s, sample.temperature_c, sample.density_pct
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_builds_samples() {
        let exp = Experiment::from_columns(
            "a",
            &[0.0, 1.0, 2.0],
            &[100.0, 110.0, 120.0],
            &[10.0, 20.0, 30.0],
        )
        .unwrap();
        assert_eq!(exp.len(), 3);
        assert_eq!(exp.times(), vec![0.0, 1.0, 2.0]);
        assert!((exp.temperatures_k()[0] - 373.15).abs() < 1e-12);
        assert!((exp.density_fractions()[2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_is_rejected() {
        let err = Experiment::new("a", vec![Sample::new(0.0, 100.0, 10.0)]).unwrap_err();
        assert!(matches!(err, SinterError::InsufficientData { .. }));
    }

    #[test]
    fn test_mismatched_columns_are_rejected() {
        let err = Experiment::from_columns("a", &[0.0, 1.0], &[100.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, SinterError::InvalidInput { .. }));
    }

    #[test]
    fn test_decreasing_time_is_rejected() {
        let err = Experiment::from_columns("a", &[0.0, 2.0, 1.0], &[100.0; 3], &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, SinterError::InvalidInput { .. }));
    }

    #[test]
    fn test_density_out_of_range_is_rejected() {
        let err =
            Experiment::from_columns("a", &[0.0, 1.0], &[100.0; 2], &[50.0, 100.5]).unwrap_err();
        assert!(matches!(err, SinterError::InvalidInput { .. }));
    }

    #[test]
    fn test_deserialization_validates() {
        let empty = serde_json::from_str::<Experiment>(r#"{"id":"x","samples":[]}"#);
        assert!(empty.is_err());

        let unsorted = serde_json::from_str::<Experiment>(
            r#"{"id":"x","samples":[
                {"time_s":2.0,"temperature_c":900.0,"density_pct":50.0},
                {"time_s":1.0,"temperature_c":900.0,"density_pct":51.0}]}"#,
        );
        assert!(unsorted.is_err());

        let exp = Experiment::from_columns("ok", &[0.0, 1.0], &[900.0; 2], &[50.0, 51.0]).unwrap();
        let text = serde_json::to_string(&exp).unwrap();
        assert_eq!(serde_json::from_str::<Experiment>(&text).unwrap(), exp);
    }

    #[test]
    fn test_isothermal_detection() {
        let iso = Experiment::from_columns("a", &[0.0, 1.0], &[900.0; 2], &[1.0, 2.0]).unwrap();
        let ramp =
            Experiment::from_columns("b", &[0.0, 1.0], &[900.0, 901.0], &[1.0, 2.0]).unwrap();
        assert!(iso.is_isothermal());
        assert!(!ramp.is_isothermal());
    }
}
