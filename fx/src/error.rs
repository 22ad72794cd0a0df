//! FX engine error types.

use ratebridge_common::CurrencyError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    /// A required conversion parameter was missing or blank.
    #[error("from, to, and amount parameters are required")]
    MissingParameters,

    /// The amount could not be parsed as a decimal.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The amount was zero or negative.
    #[error("amount must be positive")]
    NonPositiveAmount,

    /// The conversion does not fit in the fixed-point range.
    #[error("amount out of range for {from} to {to}")]
    AmountOutOfRange { from: String, to: String },

    /// Currency is not in the registry.
    #[error("unsupported currency {0}")]
    UnsupportedCurrency(String),

    /// Currency was requested but the rate source did not return it.
    #[error("currency '{0}' is not supported or not available")]
    NotSupportedByProvider(String),

    /// Fewer than two distinct currencies were requested.
    #[error("at least two currencies are required, got {count}")]
    InsufficientCurrencies { count: usize },

    /// A zero or negative rate was encountered while deriving a cross-rate.
    #[error("invalid rate: {from}={from_rate}, {to}={to_rate}")]
    InvalidRate {
        from: String,
        from_rate: Decimal,
        to: String,
        to_rate: Decimal,
    },

    /// Circuit breaker is open; the provider was not called.
    #[error("external rates API is currently unavailable (service protection active)")]
    ProviderUnavailable,

    /// Circuit breaker is half-open and its trial quota is used up.
    #[error("external rates API is being rate limited (too many requests)")]
    ProviderOverloaded,

    /// The request never produced a response (connect, timeout, cancellation).
    #[error("failed to reach rates provider: {0}")]
    ProviderNetwork(String),

    /// The response body was not the expected JSON.
    #[error("failed to decode rates provider response: {0}")]
    ProviderDecode(String),

    /// The provider answered with a non-success status.
    #[error("rates provider returned status {status}")]
    ProviderHttp { status: u16 },
}

impl FxError {
    /// Detected locally, without touching the network or the breaker.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FxError::MissingParameters
                | FxError::InvalidAmount(_)
                | FxError::NonPositiveAmount
                | FxError::AmountOutOfRange { .. }
                | FxError::UnsupportedCurrency(_)
                | FxError::NotSupportedByProvider(_)
                | FxError::InsufficientCurrencies { .. }
        )
    }

    /// The breaker refused the call. Retrying immediately is pointless.
    pub fn is_breaker_rejection(&self) -> bool {
        matches!(self, FxError::ProviderUnavailable | FxError::ProviderOverloaded)
    }

    /// Raw transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FxError::ProviderNetwork(_) | FxError::ProviderDecode(_) | FxError::ProviderHttp { .. }
        )
    }

    /// Check if a later request may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FxError::ProviderNetwork(_) => true,
            FxError::ProviderHttp { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get error code for transport responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::MissingParameters => "PARAMETERS_REQUIRED",
            FxError::InvalidAmount(_) => "INVALID_AMOUNT",
            FxError::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            FxError::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            FxError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            FxError::NotSupportedByProvider(_) => "UNSUPPORTED_CURRENCY",
            FxError::InsufficientCurrencies { .. } => "INSUFFICIENT_CURRENCIES",
            FxError::InvalidRate { .. } => "INVALID_RATE",
            FxError::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            FxError::ProviderOverloaded => "PROVIDER_OVERLOADED",
            FxError::ProviderNetwork(_) => "PROVIDER_NETWORK_ERROR",
            FxError::ProviderDecode(_) => "PROVIDER_DECODE_ERROR",
            FxError::ProviderHttp { .. } => "PROVIDER_HTTP_ERROR",
        }
    }
}

impl From<CurrencyError> for FxError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::UnknownCurrency(code) => FxError::UnsupportedCurrency(code),
            CurrencyError::InvalidCurrency { code, .. } => FxError::UnsupportedCurrency(code),
            CurrencyError::DuplicateCurrency(code) => FxError::UnsupportedCurrency(code),
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
