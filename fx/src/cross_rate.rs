//! Pairwise rate matrix derived from base-relative rates.

use ratebridge_common::{CurrencyCode, ExchangeRate};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};
use crate::provider::{ProviderRates, RateProvider};

/// Every ordered pair of the requested currencies, with its rate.
#[derive(Debug, Clone, PartialEq)]
pub struct RateMatrix {
    /// Outer loop over `from`, inner over `to`, in request order.
    pub rates: Vec<ExchangeRate>,
    /// Source description from the provider.
    pub source: String,
}

impl RateMatrix {
    /// Find the rate for a pair.
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = CurrencyCode::new(from);
        let to = CurrencyCode::new(to);
        self.rates
            .iter()
            .find(|r| r.from == from && r.to == to)
            .map(|r| r.rate)
    }
}

/// Builds the full rate matrix for a currency set from one provider call.
pub struct CrossRateCalculator {
    provider: Arc<dyn RateProvider>,
}

impl CrossRateCalculator {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn RateProvider> {
        &self.provider
    }

    /// Get the rate for every ordered pair of `currencies`.
    ///
    /// Codes are trimmed and upper-cased; blanks and repeats are dropped
    /// before the two-currency minimum is checked. Rates are not rounded.
    #[instrument(skip(self, currencies), fields(provider = self.provider.name()))]
    pub async fn get_all_rates<S: AsRef<str>>(&self, currencies: &[S]) -> FxResult<RateMatrix> {
        let codes = normalize(currencies);
        if codes.len() < 2 {
            return Err(FxError::InsufficientCurrencies { count: codes.len() });
        }

        let provided = self.provider.get_rates(&codes).await?;

        for code in &codes {
            if provided.get(code).is_none() {
                return Err(FxError::NotSupportedByProvider(code.to_string()));
            }
        }

        let mut rates = Vec::with_capacity(codes.len() * (codes.len() - 1));
        for from in &codes {
            for to in &codes {
                if from != to {
                    rates.push(ExchangeRate::new(
                        from.clone(),
                        to.clone(),
                        cross_rate(&provided, from, to)?,
                    ));
                }
            }
        }

        debug!(pairs = rates.len(), source = %provided.source, "Built rate matrix");
        Ok(RateMatrix {
            rates,
            source: provided.source,
        })
    }
}

/// Normalise codes, keeping first occurrences in request order.
fn normalize<S: AsRef<str>>(currencies: &[S]) -> Vec<CurrencyCode> {
    let mut codes: Vec<CurrencyCode> = Vec::with_capacity(currencies.len());
    for raw in currencies {
        let code = CurrencyCode::new(raw);
        if !code.is_empty() && !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// `rate(from -> to) = rate[to] / rate[from]`, both strictly positive.
fn cross_rate(provided: &ProviderRates, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<Decimal> {
    let from_rate = provided
        .get(from)
        .ok_or_else(|| FxError::NotSupportedByProvider(from.to_string()))?;
    let to_rate = provided
        .get(to)
        .ok_or_else(|| FxError::NotSupportedByProvider(to.to_string()))?;

    let invalid = || FxError::InvalidRate {
        from: from.to_string(),
        from_rate,
        to: to.to_string(),
        to_rate,
    };
    if from_rate <= Decimal::ZERO || to_rate <= Decimal::ZERO {
        return Err(invalid());
    }
    to_rate.checked_div(from_rate).ok_or_else(invalid)
}
