//! Shapiro–Wilk test for normality (Royston, 1995, algorithm AS R94)

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::SinterError;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// `c[0] + c[1]·x + c[2]·x² + …`
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, coefficient| acc * x + coefficient)
}

fn standard_normal() -> Result<Normal, SinterError> {
    Normal::new(0.0, 1.0).map_err(|e| SinterError::invalid(format!("normal distribution: {}", e)))
}

/// Coefficients `a_1 … a_{n/2}` of the upper half of the sorted sample
fn coefficients(n: usize) -> Result<Vec<f64>, SinterError> {
    let half = n / 2;
    if n == 3 {
        return Ok(vec![std::f64::consts::FRAC_1_SQRT_2]);
    }

    let normal = standard_normal()?;
    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut a = vec![0.0; half];
    a[0] = a1;

    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    for i in first..half {
        a[i] = -m[i] / fac;
    }
    Ok(a)
}

/// The W statistic of a sorted sample with positive range
fn statistic(sorted: &[f64], a: &[f64]) -> f64 {
    let n = sorted.len();
    let range = sorted[n - 1] - sorted[0];
    let scaled: Vec<f64> = sorted.iter().map(|v| v / range).collect();
    let mean = scaled.iter().sum::<f64>() / n as f64;
    let ssq: f64 = scaled.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (scaled[n - 1 - i] - scaled[i]))
        .sum();
    (numerator * numerator / ssq).min(1.0)
}

/// Upper tail probability of `W` under normality
fn p_value(w: f64, n: usize) -> Result<f64, SinterError> {
    if w >= 1.0 {
        return Ok(1.0);
    }
    if n == 3 {
        let pw = (6.0 / std::f64::consts::PI) * (w.sqrt().asin() - std::f64::consts::FRAC_PI_3);
        return Ok(pw.max(0.0));
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();
    let (mean, sd) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(1e-99);
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    let z = (y - mean) / sd;
    Ok(standard_normal()?.sf(z))
}

/// p-value of the Shapiro–Wilk test that `residuals` come from a normal distribution
///
/// Small p-values indicate a departure from normality.
///
/// # Errors
///
/// * [SinterError::InsufficientData] with fewer than three values
/// * [SinterError::InvalidInput] for non-finite values or a sample with zero range
///
/// # Example
///
/// ```
/// use sinterfit::stats::shapiro_normality;
///
/// let p = shapiro_normality(&[148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0]).unwrap();
/// assert!(p < 0.05);
/// ```
pub fn shapiro_normality(residuals: &[f64]) -> Result<f64, SinterError> {
    let n = residuals.len();
    if n < 3 {
        return Err(SinterError::insufficient(format!(
            "Shapiro-Wilk needs at least 3 values, got {}",
            n
        )));
    }
    if !residuals.iter().all(|v| v.is_finite()) {
        return Err(SinterError::invalid("residuals contain non-finite values"));
    }
    if n > 5000 {
        tracing::warn!(n, "Shapiro-Wilk p-value may be inaccurate for more than 5000 values");
    }

    let mut sorted = residuals.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted[n - 1] - sorted[0] <= 0.0 {
        return Err(SinterError::invalid("all residuals are identical"));
    }

    let a = coefficients(n)?;
    let w = statistic(&sorted, &a);
    p_value(w, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_scores_look_normal() {
        let normal = standard_normal().unwrap();
        let n = 30;
        let sample: Vec<f64> = (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (n as f64 + 0.25)))
            .collect();
        let p = shapiro_normality(&sample).unwrap();
        assert!(p > 0.5, "p = {}", p);
    }

    #[test]
    fn test_skewed_sample_is_rejected() {
        let sample = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let p = shapiro_normality(&sample).unwrap();
        assert!(p < 0.05, "p = {}", p);
    }

    #[test]
    fn test_exponential_sample_is_rejected() {
        let sample: Vec<f64> = (0..40).map(|i| (1.15f64).powi(i)).collect();
        let p = shapiro_normality(&sample).unwrap();
        assert!(p < 0.01, "p = {}", p);
    }

    #[test]
    fn test_three_equally_spaced_values() {
        let p = shapiro_normality(&[1.0, 2.0, 3.0]).unwrap();
        assert!(p > 0.99);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = shapiro_normality(&[3.1, -0.4, 1.2, 0.8, 2.2, -1.5, 0.1]).unwrap();
        let b = shapiro_normality(&[-1.5, -0.4, 0.1, 0.8, 1.2, 2.2, 3.1]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_samples() {
        assert!(matches!(
            shapiro_normality(&[1.0, 2.0]),
            Err(SinterError::InsufficientData { .. })
        ));
        assert!(matches!(
            shapiro_normality(&[1.0, 1.0, 1.0]),
            Err(SinterError::InvalidInput { .. })
        ));
        assert!(shapiro_normality(&[1.0, f64::NAN, 2.0]).is_err());
    }

    #[test]
    fn test_poly_evaluates_in_ascending_powers() {
        assert_eq!(poly(&[1.0, 2.0, 3.0], 2.0), 17.0);
    }
}
