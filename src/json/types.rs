use serde::{Deserialize, Serialize};

use crate::kinetics::FitOptions;
use crate::master::MasterCurveOptions;
use crate::stats::BootstrapOptions;

/// A single point of a sintering experiment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SinteringRecord {
    /// Time in seconds
    #[serde(alias = "time_s")]
    pub time: f64,
    /// Temperature in °C
    #[serde(alias = "temperature_c")]
    pub temperature: f64,
    /// Relative density in percent
    #[serde(alias = "density_pct")]
    pub density: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Calibration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrateRequest {
    /// One record list per experiment
    pub experiments: Vec<Vec<SinteringRecord>>,
    #[serde(default)]
    pub options: FitOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrateResponse {
    /// Activation energy in kJ/mol
    #[serde(rename = "Ea")]
    pub ea: f64,
    /// Pre-exponential factor in 1/s
    #[serde(rename = "A")]
    pub a: f64,
    pub r_squared: f64,
    pub n_points: usize,
    pub ea_std_error: f64,
    /// Shapiro–Wilk p-value of the log-rate residuals, null with fewer than 3 points
    pub shapiro_p: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Master curve
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterCurveRequest {
    pub records: Vec<SinteringRecord>,
    /// Activation energy in kJ/mol, fitted from the records when absent
    #[serde(default)]
    pub activation_energy: Option<f64>,
    #[serde(default)]
    pub options: MasterCurveOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterCurveResponse {
    pub master_time: Vec<f64>,
    pub master_density: Vec<f64>,
    pub activation_energy: f64,
    pub reference_temperature: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Refinement
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default = "default_polyorder")]
    pub polyorder: usize,
}

fn default_polyorder() -> usize {
    2
}

/// Filters applied in order: range selection, bin averaging, smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub records: Vec<SinteringRecord>,
    #[serde(default)]
    pub time_range: Option<(f64, f64)>,
    #[serde(default)]
    pub density_range: Option<(f64, f64)>,
    #[serde(default)]
    pub bin_size: Option<f64>,
    #[serde(default)]
    pub smoothing: Option<Smoothing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineResponse {
    pub records: Vec<SinteringRecord>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub experiments: Vec<Vec<SinteringRecord>>,
    #[serde(default)]
    pub options: BootstrapOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub ci_low: f64,
    pub ci_high: f64,
    pub n_successful: usize,
    pub n_failed: usize,
}
