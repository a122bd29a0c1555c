use thiserror::Error;

/// Errors raised by the kinetic analysis core
#[derive(Error, Debug)]
pub enum SinterError {
    /// Fewer valid points than an operation needs (samples, residuals, pooled rates)
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    /// The ODE integrator did not reach the end of the grid or produced non-finite values
    #[error("Integration failed: {reason}")]
    Integration { reason: String },

    /// Malformed shapes, mismatched lengths or out-of-range values
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// An injected capability (FEM solver, mesher) is not available in this build
    #[error("{capability} is not available")]
    Unavailable { capability: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinterError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        SinterError::InsufficientData {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SinterError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn integration(reason: impl Into<String>) -> Self {
        SinterError::Integration {
            reason: reason.into(),
        }
    }
}

impl From<diffsol::error::DiffsolError> for SinterError {
    fn from(error: diffsol::error::DiffsolError) -> Self {
        SinterError::integration(error.to_string())
    }
}
