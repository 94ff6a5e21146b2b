//! Error types.
//!
//! - `ForecastError` is the typed error of the calibration core.
//! - `AppError` carries a process exit code and is what the binary reports.

use thiserror::Error;

/// Errors produced by the calibration core.
///
/// Only `InvalidInput` is ever returned to callers of the forecast entry points.
/// The assistant variants describe why the guardrail fell back and are surfaced
/// through `GuardrailTrace` rather than as a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Assistant unavailable: {0}")]
    AssistantUnavailable(String),
    #[error("Assistant contract violation: {0}")]
    AssistantContractViolation(String),
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

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        let exit_code = match err {
            ForecastError::InvalidInput(_) => 2,
            ForecastError::AssistantUnavailable(_) | ForecastError::AssistantContractViolation(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_usage_exit_code() {
        let err: AppError = ForecastError::InvalidInput("marketProb is NaN".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("marketProb is NaN"));
    }
}
