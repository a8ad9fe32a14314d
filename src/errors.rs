use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MortgageError {
    #[error("invalid input: {field}: {reason}")]
    InvalidInput {
        field: String,
        reason: String,
    },

    #[error("irr did not converge after {iterations} iterations (last estimate {last_estimate})")]
    NumericDivergence {
        iterations: u32,
        last_estimate: Decimal,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MortgageError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        MortgageError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        MortgageError::CalculationError {
            message: message.into(),
        }
    }

    /// true for errors caused by the caller's payload
    pub fn is_client_error(&self) -> bool {
        matches!(self, MortgageError::InvalidInput { .. } | MortgageError::Serialization(_))
    }
}

impl From<serde_json::Error> for MortgageError {
    fn from(e: serde_json::Error) -> Self {
        MortgageError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MortgageError>;
