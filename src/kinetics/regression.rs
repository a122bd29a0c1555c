use serde::{Deserialize, Serialize};

/// Ordinary least squares fit of `y = intercept + slope · x`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Number of points in the fit
    pub n: usize,
    /// Standard error of the slope, NaN with fewer than three points
    pub slope_std_error: f64,
    /// Standard error of the intercept, NaN with fewer than three points
    pub intercept_std_error: f64,
    /// `y − ŷ` for every point, in input order
    pub residuals: Vec<f64>,
}

/// Least squares line through `(x, y)`
///
/// Returns `None` for fewer than two points, mismatched lengths, or when all
/// `x` values coincide.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }

    let n_f = n as f64;

    let x_mean: f64 = x.iter().sum::<f64>() / n_f;
    let y_mean: f64 = y.iter().sum::<f64>() / n_f;

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;

    for i in 0..n {
        let x_diff = x[i] - x_mean;
        let y_diff = y[i] - y_mean;
        ss_xy += x_diff * y_diff;
        ss_xx += x_diff * x_diff;
        ss_yy += y_diff * y_diff;
    }

    // Spread in x relative to its magnitude; 1/T values are O(1e-3)
    let scale = x_mean.abs().max(f64::MIN_POSITIVE);
    if ss_xx <= n_f * (scale * 1e-12).powi(2) {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = y_mean - slope * x_mean;

    let residuals: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| yi - (intercept + slope * xi))
        .collect();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();

    let r_squared = if ss_yy.abs() < 1e-15 {
        1.0
    } else {
        (ss_xy * ss_xy) / (ss_xx * ss_yy)
    };

    let (slope_std_error, intercept_std_error) = if n > 2 {
        let variance = sse / (n_f - 2.0);
        (
            (variance / ss_xx).sqrt(),
            (variance * (1.0 / n_f + x_mean * x_mean / ss_xx)).sqrt(),
        )
    } else {
        (f64::NAN, f64::NAN)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        n,
        slope_std_error,
        intercept_std_error,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, 2.0, max_relative = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, max_relative = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, max_relative = 1e-12);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-12));
        assert!(fit.slope_std_error.abs() < 1e-9);
    }

    #[test]
    fn test_standard_errors() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 0.0, 2.0, 3.0, 4.0];
        let fit = linear_regression(&x, &y).unwrap();
        let variance: f64 = fit.residuals.iter().map(|r| r * r).sum::<f64>() / 3.0;
        assert_relative_eq!(fit.slope_std_error, (variance / 10.0).sqrt(), max_relative = 1e-12);
        assert_relative_eq!(
            fit.intercept_std_error,
            (variance * (0.2 + 4.0 / 10.0)).sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_arrhenius_scale_is_not_degenerate() {
        let x: Vec<f64> = [1273.15, 1283.15, 1293.15].iter().map(|t| 1.0 / t).collect();
        let y = [-3.0, -2.9, -2.8];
        assert!(linear_regression(&x, &y).is_some());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(linear_regression(&[1.0], &[1.0]).is_none());
        assert!(linear_regression(&[1.0, 2.0], &[1.0]).is_none());
        let same = 1.0 / 1273.15;
        assert!(linear_regression(&[same, same, same], &[1.0, 2.0, 3.0]).is_none());
    }
}
