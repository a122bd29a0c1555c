//! Resampling inference and diagnostics on top of the parameter estimator
pub mod bootstrap;
pub mod report;
pub mod shapiro;

pub use bootstrap::{confidence_interval, BootstrapOptions, BootstrapResult};
pub use report::{render_report, ReportFormat};
pub use shapiro::shapiro_normality;
