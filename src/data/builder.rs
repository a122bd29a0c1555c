use crate::data::*;
use crate::error::SinterError;

/// Incremental constructor for an [Experiment]
///
/// Samples are validated only when [ExperimentBuilder::build] is called.
pub struct ExperimentBuilder {
    id: String,
    samples: Vec<Sample>,
}

impl Experiment {
    pub fn builder(id: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder {
            id: id.into(),
            samples: Vec::new(),
        }
    }
}

impl ExperimentBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn sample(mut self, time_s: f64, temperature_c: f64, density_pct: f64) -> Self {
        self.samples
            .push(Sample::new(time_s, temperature_c, density_pct));
        self
    }

    pub fn samples(mut self, samples: impl IntoIterator<Item = Sample>) -> Self {
        self.samples.extend(samples);
        self
    }

    /// Repeat the last sample `n` times, shifting time by `delta` and density by `density_step`
    ///
    /// Useful for describing dwell segments where the temperature is held constant.
    pub fn repeat(mut self, n: usize, delta: f64, density_step: f64) -> Self {
        let last = match self.samples.last() {
            Some(sample) => *sample,
            None => return self,
        };
        for i in 1..=n {
            self.samples.push(Sample::new(
                last.time_s + delta * i as f64,
                last.temperature_c,
                (last.density_pct + density_step * i as f64).clamp(0.0, 100.0),
            ));
        }
        self
    }

    pub fn build(self) -> Result<Experiment, SinterError> {
        Experiment::new(self.id, self.samples)
    }
}
