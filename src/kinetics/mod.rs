//! Arrhenius kinetics: rate estimation, regression and parameter fitting
pub mod fit;
pub mod rate;
pub mod regression;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use fit::{fit, try_fit, FitOptions, KineticFit, Refinement};
pub use rate::{pointwise_rate, RateEstimator, RatePoints};
pub use regression::{linear_regression, LinearFit};

/// Universal gas constant in J/(mol·K)
pub const GAS_CONSTANT: f64 = 8.314;

/// Parameters of the Arrhenius law `k(T) = A · exp(−Ea · 1000 / (R · T))`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct KineticParameters {
    /// Activation energy in kJ/mol
    pub ea_kj: f64,
    /// Pre-exponential factor in 1/s
    pub a: f64,
}

impl KineticParameters {
    pub fn new(ea_kj: f64, a: f64) -> Self {
        KineticParameters { ea_kj, a }
    }

    /// Recover the parameters from the slope and intercept of `ln k` against `1/T`
    pub fn from_arrhenius_line(slope: f64, intercept: f64, gas_constant: f64) -> Self {
        KineticParameters {
            ea_kj: -slope * gas_constant / 1000.0,
            a: intercept.exp(),
        }
    }

    /// Rate coefficient in 1/s at `temperature_k`
    #[inline]
    pub fn rate(&self, temperature_k: f64, gas_constant: f64) -> f64 {
        self.a * (-self.ea_kj * 1000.0 / (gas_constant * temperature_k)).exp()
    }

    /// `ln k` at `temperature_k`, finite even when `k` underflows
    #[inline]
    pub fn ln_rate(&self, temperature_k: f64, gas_constant: f64) -> f64 {
        self.a.ln() - self.ea_kj * 1000.0 / (gas_constant * temperature_k)
    }

    pub fn is_finite(&self) -> bool {
        self.ea_kj.is_finite() && self.a.is_finite()
    }
}

impl fmt::Display for KineticParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ea = {:.4} kJ/mol, A = {:.6e} 1/s", self.ea_kj, self.a)
    }
}
