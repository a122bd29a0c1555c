//! JSON payloads for web and UI front ends
//!
//! Requests carry experiments as lists of [SinteringRecord]s; handlers turn
//! them into [Experiment](crate::data::Experiment)s, run the analysis and
//! return plain numeric responses.
//!
//! Strict JSON has no `NaN` literal. Serialising through [to_json] writes
//! every non-finite float as `null`, so responses can carry failed or
//! undefined statistics (for example a standard error from two points).
//!
//! ```
//! use sinterfit::json::{calibrate, to_json, CalibrateRequest};
//!
//! let request: CalibrateRequest = serde_json::from_str(r#"{
//!     "experiments": [[
//!         {"time": 0, "temperature": 1000, "density": 0},
//!         {"time": 10, "temperature": 1000, "density": 20},
//!         {"time": 20, "temperature": 1000, "density": 36}
//!     ], [
//!         {"time": 0, "temperature": 1100, "density": 0},
//!         {"time": 10, "temperature": 1100, "density": 40},
//!         {"time": 20, "temperature": 1100, "density": 64}
//!     ]]
//! }"#).unwrap();
//! let response = calibrate(&request).unwrap();
//! let text = to_json(&response).unwrap();
//! assert!(text.contains("\"Ea\""));
//! ```

mod config;
mod handlers;
mod types;

pub use config::AnalysisConfig;
pub use handlers::{bootstrap, calibrate, master_curve, records_to_experiment, refine};
pub use types::*;

use serde::Serialize;

use crate::error::SinterError;

/// Serialise a response, writing non-finite floats as `null`
pub fn to_json<T: Serialize>(value: &T) -> Result<String, SinterError> {
    Ok(serde_json::to_string(value)?)
}
