//! Error types for the currency registry.

use thiserror::Error;

/// Errors raised while defining or looking up currencies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The code is not present in the registry.
    #[error("unsupported currency {0}")]
    UnknownCurrency(String),

    /// A currency definition violates its invariants.
    #[error("invalid currency {code}: {reason}")]
    InvalidCurrency { code: String, reason: String },

    /// The same code was registered twice.
    #[error("duplicate currency {0}")]
    DuplicateCurrency(String),
}

impl CurrencyError {
    /// Get error code for transport responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CurrencyError::UnknownCurrency(_) => "UNSUPPORTED_CURRENCY",
            CurrencyError::InvalidCurrency { .. } => "INVALID_CURRENCY",
            CurrencyError::DuplicateCurrency(_) => "DUPLICATE_CURRENCY",
        }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, CurrencyError>;
