pub mod builder;
pub mod filter;
pub mod parser;
pub mod structs;
pub use builder::ExperimentBuilder;
pub use structs::{Experiment, Sample, CELSIUS_TO_KELVIN};
