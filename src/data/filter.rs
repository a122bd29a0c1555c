//! Pre-processing of raw sintering series
//!
//! Range refinement, bin averaging and Savitzky–Golay smoothing. All
//! operations return a new [Experiment]; the input is left untouched.

use nalgebra::{DMatrix, DVector};

use crate::data::{Experiment, Sample};
use crate::error::SinterError;

impl Experiment {
    /// Keep samples whose time and density fall inside the inclusive windows
    ///
    /// A `None` window keeps everything along that axis.
    pub fn refine(
        &self,
        time_range: Option<(f64, f64)>,
        density_range: Option<(f64, f64)>,
    ) -> Result<Experiment, SinterError> {
        let inside = |value: f64, range: Option<(f64, f64)>| match range {
            Some((low, high)) => value >= low && value <= high,
            None => true,
        };
        let samples: Vec<Sample> = self
            .samples()
            .iter()
            .filter(|s| inside(s.time_s, time_range) && inside(s.density_pct, density_range))
            .copied()
            .collect();
        Experiment::new(self.id(), samples)
    }

    /// Average all samples that fall in the same `bin_size_s` wide time window
    ///
    /// Windows are `floor(t / bin_size_s)`; empty windows produce no sample.
    pub fn bin_average(&self, bin_size_s: f64) -> Result<Experiment, SinterError> {
        if !(bin_size_s.is_finite() && bin_size_s > 0.0) {
            return Err(SinterError::invalid(format!(
                "bin size must be positive and finite, got {}",
                bin_size_s
            )));
        }

        let mut averaged = Vec::new();
        let mut current_bin: Option<i64> = None;
        let mut acc = (0.0, 0.0, 0.0, 0usize);

        let flush = |acc: &mut (f64, f64, f64, usize), out: &mut Vec<Sample>| {
            if acc.3 > 0 {
                let n = acc.3 as f64;
                out.push(Sample::new(acc.0 / n, acc.1 / n, acc.2 / n));
            }
            *acc = (0.0, 0.0, 0.0, 0);
        };

        for sample in self.samples() {
            let bin = (sample.time_s / bin_size_s).floor() as i64;
            if current_bin != Some(bin) {
                flush(&mut acc, &mut averaged);
                current_bin = Some(bin);
            }
            acc.0 += sample.time_s;
            acc.1 += sample.temperature_c;
            acc.2 += sample.density_pct;
            acc.3 += 1;
        }
        flush(&mut acc, &mut averaged);

        Experiment::new(self.id(), averaged)
    }

    /// Savitzky–Golay smoothing of the temperature and density columns
    ///
    /// `window` defaults to `min(11, max(3, 2⌊n/2⌋ + 1))`; it is forced odd and
    /// clamped to the series length. When the window cannot hold a polynomial of
    /// `polyorder`, the experiment is returned unchanged. The first and last
    /// `window / 2` points are evaluated on a polynomial fitted to the first and
    /// last full window.
    pub fn savitzky_golay(
        &self,
        window: Option<usize>,
        polyorder: usize,
    ) -> Result<Experiment, SinterError> {
        let n = self.len();
        let mut window = window.unwrap_or_else(|| 11.min(3.max((n / 2) * 2 + 1)));
        if window % 2 == 0 {
            window += 1;
        }
        let largest_odd = if n % 2 == 0 { n.saturating_sub(1) } else { n };
        window = window.min(largest_odd);
        if window <= polyorder {
            return Ok(self.clone());
        }

        let filter = SavitzkyGolay::new(window, polyorder)?;
        let temperature = filter.apply(&self.temperatures_c());
        let density = filter.apply(&self.densities_pct());

        let samples = self
            .samples()
            .iter()
            .zip(temperature)
            .zip(density)
            .map(|((s, temp), dens)| Sample::new(s.time_s, temp, dens.clamp(0.0, 100.0)))
            .collect();
        Experiment::new(self.id(), samples)
    }
}

/// Least-squares polynomial projector over a fixed odd window
struct SavitzkyGolay {
    window: usize,
    polyorder: usize,
    /// `(polyorder + 1) x window` matrix mapping window values to polynomial coefficients
    projector: DMatrix<f64>,
}

impl SavitzkyGolay {
    fn new(window: usize, polyorder: usize) -> Result<Self, SinterError> {
        let half = (window / 2) as f64;
        let vander = DMatrix::from_fn(window, polyorder + 1, |r, c| {
            (r as f64 - half).powi(c as i32)
        });
        let normal = vander.transpose() * &vander;
        let inverse = normal.try_inverse().ok_or_else(|| {
            SinterError::invalid("Savitzky-Golay normal equations are singular")
        })?;
        Ok(SavitzkyGolay {
            window,
            polyorder,
            projector: inverse * vander.transpose(),
        })
    }

    fn coefficients(&self, values: &[f64]) -> DVector<f64> {
        &self.projector * DVector::from_column_slice(values)
    }

    fn evaluate(&self, coefficients: &DVector<f64>, offset: f64) -> f64 {
        (0..=self.polyorder)
            .rev()
            .fold(0.0, |acc, p| acc * offset + coefficients[p])
    }

    fn apply(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let half = self.window / 2;
        let mut smoothed = vec![0.0; n];

        for (i, slot) in smoothed
            .iter_mut()
            .enumerate()
            .take(n - half)
            .skip(half)
        {
            let coefficients = self.coefficients(&values[i - half..=i + half]);
            *slot = coefficients[0];
        }

        let head = self.coefficients(&values[..self.window]);
        for (i, slot) in smoothed.iter_mut().enumerate().take(half) {
            *slot = self.evaluate(&head, i as f64 - half as f64);
        }

        let tail_start = n - self.window;
        let tail = self.coefficients(&values[tail_start..]);
        for (i, slot) in smoothed.iter_mut().enumerate().skip(n - half) {
            *slot = self.evaluate(&tail, (i - tail_start) as f64 - half as f64);
        }

        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_experiment(n: usize) -> Experiment {
        let times: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let temps: Vec<f64> = times.iter().map(|t| 1000.0 + 2.0 * t).collect();
        let dens: Vec<f64> = times.iter().map(|t| 50.0 + 0.5 * t).collect();
        Experiment::from_columns("lin", &times, &temps, &dens).unwrap()
    }

    #[test]
    fn test_refine_keeps_window() {
        let exp = linear_experiment(10);
        let refined = exp.refine(Some((2.0, 6.0)), Some((51.5, 60.0))).unwrap();
        assert_eq!(refined.times(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_refine_to_single_sample_fails() {
        let exp = linear_experiment(10);
        assert!(exp.refine(Some((2.0, 2.0)), None).is_err());
    }

    #[test]
    fn test_bin_average_groups_by_window() {
        let exp = linear_experiment(10);
        let binned = exp.bin_average(5.0).unwrap();
        assert_eq!(binned.len(), 2);
        assert_relative_eq!(binned.samples()[0].time_s, 2.0);
        assert_relative_eq!(binned.samples()[1].time_s, 7.0);
        assert_relative_eq!(binned.samples()[1].density_pct, 53.5);
    }

    #[test]
    fn test_bin_average_rejects_zero_bin() {
        assert!(linear_experiment(4).bin_average(0.0).is_err());
    }

    #[test]
    fn test_savitzky_golay_preserves_polynomials() {
        // A quadratic filter reproduces linear data exactly, including the edges
        let exp = linear_experiment(15);
        let smoothed = exp.savitzky_golay(Some(7), 2).unwrap();
        for (a, b) in exp.samples().iter().zip(smoothed.samples()) {
            assert_relative_eq!(a.density_pct, b.density_pct, max_relative = 1e-10);
            assert_relative_eq!(a.temperature_c, b.temperature_c, max_relative = 1e-10);
            assert_eq!(a.time_s, b.time_s);
        }
    }

    #[test]
    fn test_savitzky_golay_reduces_noise() {
        let times: Vec<f64> = (0..21).map(|i| i as f64).collect();
        let temps = vec![1000.0; 21];
        let dens: Vec<f64> = times
            .iter()
            .map(|t| 50.0 + t + if (*t as usize) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let exp = Experiment::from_columns("noisy", &times, &temps, &dens).unwrap();
        let smoothed = exp.savitzky_golay(None, 2).unwrap();

        let roughness = |e: &Experiment| -> f64 {
            e.densities_pct()
                .windows(3)
                .map(|w| (w[0] - 2.0 * w[1] + w[2]).abs())
                .sum()
        };
        assert!(roughness(&smoothed) < roughness(&exp));
    }

    #[test]
    fn test_savitzky_golay_short_series_is_unchanged() {
        let exp = linear_experiment(2);
        let smoothed = exp.savitzky_golay(None, 2).unwrap();
        assert_eq!(exp, smoothed);
    }
}
