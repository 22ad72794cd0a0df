//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ratebridge_fx::FxError;
use serde::Serialize;
use thiserror::Error;

pub const RATES_EXAMPLE: &str = "GET /api/v1/rates?currencies=USD,EUR,GBP";
pub const EXCHANGE_EXAMPLE: &str = "GET /api/v1/exchange?from=WBTC&to=USDT&amount=1.0";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Fx(#[from] FxError),
    /// A required query parameter was absent. Carries an example request.
    #[error("{message}")]
    MissingParameter {
        message: &'static str,
        example: &'static str,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Fx(err) => fx_status(err),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter { .. } => "PARAMETERS_REQUIRED",
            ApiError::Fx(err) => err.error_code(),
        }
    }
}

fn fx_status(err: &FxError) -> StatusCode {
    if err.is_validation() {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        FxError::ProviderOverloaded => StatusCode::TOO_MANY_REQUESTS,
        FxError::ProviderUnavailable => StatusCode::FAILED_DEPENDENCY,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let example = match &self {
            ApiError::MissingParameter { example, .. } => Some(*example),
            ApiError::Fx(FxError::MissingParameters) => Some(EXCHANGE_EXAMPLE),
            ApiError::Fx(_) => None,
        };
        let body = Json(ErrorBody {
            code: self.code(),
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.to_string(),
            example,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
