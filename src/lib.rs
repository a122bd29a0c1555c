//! Arrhenius kinetic analysis of sintering experiments
//!
//! `sinterfit` estimates the activation energy `Ea` and pre-exponential
//! factor `A` of a densification process from time–temperature–density
//! series, integrates the corresponding rate law, builds master curves by
//! time–temperature superposition and quantifies the uncertainty of `Ea` by
//! bootstrap resampling.
//!
//! ```
//! use sinterfit::prelude::*;
//!
//! let truth = KineticParameters::new(75.0, 5.0);
//! let times: Vec<f64> = (0..10).map(|i| i as f64 * 30.0).collect();
//! let experiments = [1000.0, 1050.0, 1100.0]
//!     .iter()
//!     .map(|t| SyntheticExperiment::new(truth, times.clone()).isothermal(*t).generate(format!("{t}")))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! let result = fit(&experiments, &FitOptions::default()).unwrap();
//! let curve = build(&experiments[0], Some(result.params.ea_kj), &MasterCurveOptions::default()).unwrap();
//! assert_eq!(curve.points.len(), 10);
//! ```

pub mod data;
pub mod error;
pub mod fem;
pub mod json;
pub mod kinetics;
pub mod master;
pub mod simulator;
pub mod stats;

pub use crate::data::{Experiment, Sample};
pub use crate::kinetics::{KineticParameters, GAS_CONSTANT};
pub use error::SinterError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            parser::{read_experiment_csv, read_experiment_reader},
            Experiment, ExperimentBuilder, Sample, CELSIUS_TO_KELVIN,
        };
    }
    pub mod simulator {
        pub use crate::simulator::{
            closed_form, integrate, predict, SinteringLaw, SolverOptions, SyntheticExperiment,
            TemperatureProfile, X0_EPSILON,
        };
    }

    pub use crate::data::*;
    pub use crate::error::SinterError;
    pub use crate::kinetics::{
        fit, pointwise_rate, try_fit, FitOptions, KineticFit, KineticParameters, RateEstimator,
        RatePoints, Refinement, GAS_CONSTANT,
    };
    pub use crate::master::{build, build_all, log_theta, MasterCurve, MasterCurveOptions};
    pub use crate::simulator::{
        integrate, SinteringLaw, SolverOptions, SyntheticExperiment, TemperatureProfile,
    };
    pub use crate::stats::{
        confidence_interval, render_report, shapiro_normality, BootstrapOptions, ReportFormat,
    };
}
