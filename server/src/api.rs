//! HTTP routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use ratebridge_common::{ExchangeRate, ExchangeResult};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::{ApiError, ApiResult, RATES_EXAMPLE};
use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

const SERVICE_NAME: &str = "ratebridge";

pub fn app_router(state: AppState) -> Router {
    Router::new()
        // `get` also answers HEAD.
        .route("/health", get(health))
        .route("/api/v1/rates", get(rates))
        .route("/api/v1/exchange", get(exchange))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: i64,
    pub environment: EnvironmentInfo,
    pub rates: RatesSourceInfo,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct EnvironmentInfo {
    pub mode: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct RatesSourceInfo {
    pub mode: String,
    pub breaker: BreakerInfo,
}

#[derive(Debug, Serialize)]
pub struct BreakerInfo {
    pub name: String,
    pub state: &'static str,
    pub requests: u32,
    pub consecutive_failures: u32,
    pub total_failures: u32,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.engine;
    let counts = engine.breaker_counts();

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: EnvironmentInfo {
            mode: state.config.environment.clone(),
            port: state.config.listen_port,
        },
        rates: RatesSourceInfo {
            mode: engine.mode().to_string(),
            breaker: BreakerInfo {
                name: engine.breaker_name().to_string(),
                state: engine.breaker_state().as_str(),
                requests: counts.requests,
                consecutive_failures: counts.consecutive_failures,
                total_failures: counts.total_failures,
            },
        },
        metrics: state.metrics.snapshot(),
    })
}

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub currencies: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub source_info: String,
    pub rates: Vec<ExchangeRate>,
}

#[instrument(skip(state))]
async fn rates(
    State(state): State<AppState>,
    Query(query): Query<RatesQuery>,
) -> ApiResult<Json<RatesResponse>> {
    state.metrics.rates_requested();

    let raw = query.currencies.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ApiError::MissingParameter {
            message: "currencies parameter is required",
            example: RATES_EXAMPLE,
        });
    }

    let currencies: Vec<&str> = raw.split(',').collect();
    match state.engine.get_all_rates(&currencies[..]).await {
        Ok(matrix) => {
            state.metrics.rates_succeeded();
            Ok(Json(RatesResponse {
                source_info: matrix.source,
                rates: matrix.rates,
            }))
        }
        Err(err) => {
            state.metrics.record_failure(&err);
            warn!(code = err.error_code(), error = %err, "Rates request failed");
            Err(err.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub amount: String,
}

#[instrument(skip(state))]
async fn exchange(
    State(state): State<AppState>,
    Query(query): Query<ExchangeQuery>,
) -> ApiResult<Json<ExchangeResult>> {
    state.metrics.conversion_requested();

    match state.engine.convert(&query.from, &query.to, &query.amount) {
        Ok(result) => {
            state.metrics.conversion_succeeded();
            Ok(Json(result))
        }
        Err(err) => {
            state.metrics.record_failure(&err);
            warn!(code = err.error_code(), error = %err, "Exchange request failed");
            Err(err.into())
        }
    }
}
