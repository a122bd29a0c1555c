use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SinterError;
use crate::fem::DensifyOptions;
use crate::kinetics::FitOptions;
use crate::master::MasterCurveOptions;
use crate::simulator::SolverOptions;
use crate::stats::BootstrapOptions;

/// All analysis settings in one document; missing sections take their defaults
///
/// ```
/// use sinterfit::json::AnalysisConfig;
///
/// let config = AnalysisConfig::from_json_str(r#"{
///     "fit": { "rate_estimator": "Gradient" },
///     "bootstrap": { "n_resamples": 200, "seed": 7 }
/// }"#).unwrap();
/// assert_eq!(config.bootstrap.n_resamples, 200);
/// assert_eq!(config.solver.max_steps, 100_000);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub solver: SolverOptions,
    pub fit: FitOptions,
    pub master_curve: MasterCurveOptions,
    pub bootstrap: BootstrapOptions,
    pub densify: DensifyOptions,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SinterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SinterError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
