use crate::domain::ModelKind;

/// Errors raised by the simulation and fitting core.
///
/// The binary converts these into [`AppError`] at the boundary so every failure
/// still maps to a stable exit code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A simulation parameter is non-finite, non-positive, or out of range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The least-squares solve did not converge, or the target has zero variance.
    #[error("{model} fit failed: {reason}")]
    FitConvergence { model: ModelKind, reason: String },

    /// Division by zero, overflow, or NaN produced during a computation.
    #[error("Numeric error in {context}: {detail}")]
    Numeric { context: String, detail: String },

    /// Malformed series or arguments handed to a core function.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SimError {
    pub fn numeric(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Numeric {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn is_fit_convergence(&self) -> bool {
        matches!(self, SimError::FitConvergence { .. })
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::InvalidParameter { .. } | SimError::InvalidInput(_) => 2,
            SimError::FitConvergence { .. } => 3,
            SimError::Numeric { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
