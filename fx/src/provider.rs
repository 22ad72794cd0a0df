//! Rate provider trait and the static mock table.

use async_trait::async_trait;
use ratebridge_common::CurrencyCode;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::error::FxResult;

/// Source description reported when no API credential is configured.
pub const MOCK_SOURCE: &str = "No API key: using mock rates";

/// Rates keyed by currency, all relative to the provider's base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRates {
    pub rates: HashMap<CurrencyCode, Decimal>,
    /// Human-readable description of where the rates came from.
    pub source: String,
}

impl ProviderRates {
    pub fn new(rates: HashMap<CurrencyCode, Decimal>, source: impl Into<String>) -> Self {
        Self {
            rates,
            source: source.into(),
        }
    }

    pub fn get(&self, code: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(code).copied()
    }
}

/// Trait for base-relative rate sources.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get rates for the requested currencies.
    ///
    /// Codes arrive normalised. The base currency, if requested, is exactly 1.
    async fn get_rates(&self, currencies: &[CurrencyCode]) -> FxResult<ProviderRates>;
}

/// Rate source backed by a fixed in-memory table.
///
/// Currencies missing from the table are left out of the result; the caller
/// decides whether that is an error.
#[derive(Debug, Clone)]
pub struct MockRateProvider {
    name: String,
    source: String,
    rates: HashMap<CurrencyCode, Decimal>,
}

impl MockRateProvider {
    /// Provider over the standard fiat table (base USD).
    pub fn new() -> Self {
        let table = [
            ("USD", Decimal::ONE),
            ("EUR", Decimal::new(85, 2)),
            ("GBP", Decimal::new(73, 2)),
            ("JPY", Decimal::new(110, 0)),
            ("CAD", Decimal::new(125, 2)),
            ("AUD", Decimal::new(135, 2)),
            ("CHF", Decimal::new(92, 2)),
            ("CNY", Decimal::new(72, 1)),
            ("SEK", Decimal::new(105, 1)),
            ("NOK", Decimal::new(112, 1)),
        ];
        Self::with_rates(table.into_iter().map(|(code, rate)| (CurrencyCode::new(code), rate)))
    }

    /// Provider over a custom table.
    pub fn with_rates(rates: impl IntoIterator<Item = (CurrencyCode, Decimal)>) -> Self {
        Self {
            name: "mock".to_string(),
            source: MOCK_SOURCE.to_string(),
            rates: rates.into_iter().collect(),
        }
    }

    /// Override the source description.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Supported codes in ascending order.
    pub fn supported(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> = self.rates.keys().cloned().collect();
        codes.sort();
        codes
    }

    fn lookup(&self, currencies: &[CurrencyCode]) -> HashMap<CurrencyCode, Decimal> {
        currencies
            .iter()
            .filter_map(|code| self.rates.get(code).map(|rate| (code.clone(), *rate)))
            .collect()
    }
}

impl Default for MockRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_rates(&self, currencies: &[CurrencyCode]) -> FxResult<ProviderRates> {
        let rates = self.lookup(currencies);
        debug!(
            requested = currencies.len(),
            found = rates.len(),
            "Serving rates from mock table"
        );
        Ok(ProviderRates::new(rates, self.source.clone()))
    }
}
