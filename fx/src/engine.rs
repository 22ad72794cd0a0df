//! Main FX engine implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ratebridge_common::ExchangeResult;
use tracing::{info, instrument};

use crate::breaker::{BreakerSettings, BreakerState, CircuitBreaker, Counts, StateTransition};
use crate::conversion::Converter;
use crate::cross_rate::{CrossRateCalculator, RateMatrix};
use crate::error::FxResult;
use crate::live::{LiveProviderConfig, LiveRateProvider, DEFAULT_REQUEST_TIMEOUT};
use crate::provider::{MockRateProvider, RateProvider};

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Credential for the live API. `None` or blank selects the mock table.
    pub api_key: Option<String>,
    /// Live API base URL.
    pub base_url: String,
    /// Upper bound on one outbound rates request.
    pub request_timeout: Duration,
    /// Circuit breaker guarding the live API.
    pub breaker: BreakerSettings,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openexchangerates.org/api".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            breaker: BreakerSettings::default(),
        }
    }
}

impl FxEngineConfig {
    /// The credential, if one is actually set.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Where rates requests are answered from. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatesMode {
    Mock,
    Live,
}

impl fmt::Display for RatesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatesMode::Mock => write!(f, "mock"),
            RatesMode::Live => write!(f, "live"),
        }
    }
}

/// The main FX engine.
pub struct FxEngine {
    calculator: CrossRateCalculator,
    converter: Converter,
    breaker: Arc<CircuitBreaker>,
    mode: RatesMode,
}

impl FxEngine {
    /// Build the engine, choosing the rate provider from credential presence.
    pub fn new(config: FxEngineConfig) -> Self {
        let breaker = Arc::new(
            CircuitBreaker::new(config.breaker.clone())
                .with_state_change_hook(Arc::new(log_transition)),
        );

        let (provider, mode): (Arc<dyn RateProvider>, RatesMode) = match config.credential() {
            Some(key) => {
                let live = LiveRateProvider::new(
                    LiveProviderConfig {
                        base_url: config.base_url.clone(),
                        api_key: key.to_string(),
                        request_timeout: config.request_timeout,
                    },
                    breaker.clone(),
                );
                (Arc::new(live), RatesMode::Live)
            }
            None => (Arc::new(MockRateProvider::new()), RatesMode::Mock),
        };

        info!(mode = %mode, breaker = %breaker.name(), "FX engine initialised");
        Self::with_provider(provider, breaker, mode)
    }

    /// Assemble an engine from explicit parts.
    pub fn with_provider(
        provider: Arc<dyn RateProvider>,
        breaker: Arc<CircuitBreaker>,
        mode: RatesMode,
    ) -> Self {
        Self {
            calculator: CrossRateCalculator::new(provider),
            converter: Converter::new(),
            breaker,
            mode,
        }
    }

    /// Get rates for every ordered pair of `currencies`.
    #[instrument(skip(self, currencies), fields(mode = %self.mode, count = currencies.len()))]
    pub async fn get_all_rates<S: AsRef<str>>(&self, currencies: &[S]) -> FxResult<RateMatrix> {
        self.calculator.get_all_rates(currencies).await
    }

    /// Convert using the static registry. Never touches the network.
    pub fn convert(&self, from: &str, to: &str, amount: &str) -> FxResult<ExchangeResult> {
        self.converter.convert(from, to, amount)
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn mode(&self) -> RatesMode {
        self.mode
    }

    pub fn breaker_name(&self) -> &str {
        self.breaker.name()
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    pub fn breaker_counts(&self) -> Counts {
        self.breaker.counts()
    }
}

fn log_transition(transition: &StateTransition) {
    info!(
        breaker = %transition.breaker,
        from = %transition.from,
        to = %transition.to,
        "Circuit breaker state changed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::provider::MOCK_SOURCE;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_without_credential_uses_mock() {
        let engine = FxEngine::new(FxEngineConfig::default());
        assert_eq!(engine.mode(), RatesMode::Mock);

        let matrix = engine.get_all_rates(&["USD", "EUR", "GBP"]).await.unwrap();
        assert_eq!(matrix.source, MOCK_SOURCE);
        assert_eq!(matrix.rates.len(), 6);
        assert_eq!(matrix.rate("USD", "JPY"), None);
        assert_eq!(matrix.rate("EUR", "GBP"), Some(dec!(0.73) / dec!(0.85)));
        assert_eq!(engine.breaker_state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_blank_credential_is_absent() {
        let engine = FxEngine::new(FxEngineConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(engine.mode(), RatesMode::Mock);
    }

    #[tokio::test]
    async fn test_mock_mode_reports_unknown_currency() {
        let engine = FxEngine::new(FxEngineConfig::default());
        let err = engine.get_all_rates(&["USD", "XYZ"]).await.unwrap_err();
        assert_eq!(err, FxError::NotSupportedByProvider("XYZ".to_string()));
    }

    #[tokio::test]
    async fn test_credential_selects_live() {
        let engine = FxEngine::new(FxEngineConfig {
            api_key: Some("key".to_string()),
            // Nothing listens here; the call must fail as a network error.
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        });
        assert_eq!(engine.mode(), RatesMode::Live);

        let err = engine.get_all_rates(&["USD", "EUR"]).await.unwrap_err();
        assert!(err.is_transport(), "{:?}", err);
        assert_eq!(engine.breaker_counts().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_validation_does_not_touch_breaker() {
        let engine = FxEngine::new(FxEngineConfig {
            api_key: Some("key".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        });

        let err = engine.get_all_rates(&["USD"]).await.unwrap_err();
        assert_eq!(err, FxError::InsufficientCurrencies { count: 1 });
        assert_eq!(engine.breaker_counts().requests, 0);
    }

    #[test]
    fn test_convert_uses_registry() {
        let engine = FxEngine::new(FxEngineConfig::default());
        let result = engine.convert("WBTC", "USDT", "1.0").unwrap();
        assert_eq!(result.amount.to_string(), "57094.314314");
        assert_eq!(
            engine.convert("X", "USDT", "1.0"),
            Err(FxError::UnsupportedCurrency("X".to_string()))
        );
    }
}
