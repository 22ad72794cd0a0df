//! Live rate provider backed by an Open Exchange Rates compatible API.

use async_trait::async_trait;
use ratebridge_common::CurrencyCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::breaker::{CallError, CircuitBreaker, Rejection};
use crate::error::{FxError, FxResult};
use crate::provider::{ProviderRates, RateProvider};

/// Source description reported for rates fetched from the live API.
pub const LIVE_SOURCE: &str = "API key provided: using live rates";

/// Default per-call timeout for the outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the live provider.
#[derive(Debug, Clone)]
pub struct LiveProviderConfig {
    /// API base URL, without the `/latest.json` suffix.
    pub base_url: String,
    /// API credential sent as `app_id`.
    pub api_key: String,
    /// Upper bound on one outbound request.
    pub request_timeout: Duration,
}

/// Success body of `GET /latest.json`. The base currency is implicit.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

/// Rate provider that calls the remote API through a circuit breaker.
pub struct LiveRateProvider {
    client: reqwest::Client,
    config: LiveProviderConfig,
    breaker: Arc<CircuitBreaker>,
}

impl LiveRateProvider {
    /// Create a provider guarded by `breaker`.
    pub fn new(config: LiveProviderConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn latest_url(&self) -> String {
        format!("{}/latest.json", self.config.base_url.trim_end_matches('/'))
    }

    /// Issue the request and decode the body.
    async fn fetch(&self, currencies: &[CurrencyCode]) -> FxResult<HashMap<String, f64>> {
        let symbols = currencies
            .iter()
            .map(CurrencyCode::code)
            .collect::<Vec<_>>()
            .join(",");
        debug!(symbols = %symbols, "Fetching rates from external API");

        let request = self
            .client
            .get(self.latest_url())
            .query(&[("app_id", self.config.api_key.as_str()), ("symbols", symbols.as_str())])
            .send();

        let response = tokio::time::timeout(self.config.request_timeout, request)
            .await
            .map_err(|_| {
                FxError::ProviderNetwork(format!(
                    "request timed out after {}s",
                    self.config.request_timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| FxError::ProviderNetwork(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::ProviderHttp {
                status: status.as_u16(),
            });
        }

        let body = tokio::time::timeout(self.config.request_timeout, response.bytes())
            .await
            .map_err(|_| FxError::ProviderNetwork("timed out reading response body".to_string()))?
            .map_err(|e| FxError::ProviderNetwork(e.to_string()))?;

        let decoded: LatestResponse =
            serde_json::from_slice(&body).map_err(|e| FxError::ProviderDecode(e.to_string()))?;
        Ok(decoded.rates)
    }
}

/// Pick the requested rates out of a provider response.
///
/// The base currency is synthesised at exactly 1. Any other requested code
/// missing from the response fails the whole batch.
fn select_rates(
    currencies: &[CurrencyCode],
    upstream: &HashMap<String, f64>,
) -> FxResult<HashMap<CurrencyCode, Decimal>> {
    let base = CurrencyCode::usd();
    let mut rates = HashMap::with_capacity(currencies.len());

    for code in currencies {
        if *code == base {
            rates.insert(code.clone(), Decimal::ONE);
            continue;
        }
        let raw = upstream
            .get(code.code())
            .ok_or_else(|| FxError::NotSupportedByProvider(code.to_string()))?;
        rates.insert(code.clone(), decimal_from_json(code, *raw)?);
    }
    Ok(rates)
}

/// Convert a JSON number through its shortest round-trip text, so `0.85`
/// becomes exactly `0.85` rather than its binary expansion.
fn decimal_from_json(code: &CurrencyCode, raw: f64) -> FxResult<Decimal> {
    Decimal::from_str(&raw.to_string()).map_err(|e| {
        FxError::ProviderDecode(format!("rate for {} is not representable: {}", code, e))
    })
}

#[async_trait]
impl RateProvider for LiveRateProvider {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    #[instrument(skip(self), fields(breaker = %self.breaker.name()))]
    async fn get_rates(&self, currencies: &[CurrencyCode]) -> FxResult<ProviderRates> {
        // A response that lacks a requested currency counts against the
        // breaker like any other failed fetch.
        let fetched = self
            .breaker
            .call(|| async {
                let upstream = self.fetch(currencies).await?;
                select_rates(currencies, &upstream)
            })
            .await;

        let rates = match fetched {
            Ok(rates) => rates,
            Err(CallError::Rejected(Rejection::Open)) => {
                warn!("Circuit breaker is open - external API unavailable");
                return Err(FxError::ProviderUnavailable);
            }
            Err(CallError::Rejected(Rejection::TooManyRequests)) => {
                warn!("Circuit breaker limiting requests");
                return Err(FxError::ProviderOverloaded);
            }
            Err(CallError::Failed(e)) => {
                error!(
                    error = %e,
                    circuit_state = %self.breaker.state(),
                    "External API failed"
                );
                return Err(e);
            }
        };

        info!(
            currencies = currencies.len(),
            circuit_state = %self.breaker.state(),
            "Fetched live rates"
        );
        Ok(ProviderRates::new(rates, LIVE_SOURCE))
    }
}
