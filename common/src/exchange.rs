//! Value objects returned by rate and conversion requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::monetary::CurrencyCode;

/// Directed rate between two distinct currencies.
///
/// `rate` is how many units of `to` one unit of `from` buys. It is kept at
/// full precision; callers round for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
}

impl ExchangeRate {
    pub fn new(from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        Self { from, to, rate }
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.from, self.to, self.rate)
    }
}

/// Outcome of a point-to-point conversion.
///
/// `amount` is denominated in `to` and already rounded to its scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResult {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
}

impl fmt::Display for ExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (from {})", self.amount, self.to, self.from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exchange_result_serializes_amount_as_string() {
        let result = ExchangeResult {
            from: CurrencyCode::new("WBTC"),
            to: CurrencyCode::new("USDT"),
            amount: dec!(57094.314314),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"from": "WBTC", "to": "USDT", "amount": "57094.314314"})
        );
    }

    #[test]
    fn test_exchange_rate_display() {
        let rate = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::new("eur"), dec!(0.85));
        assert_eq!(rate.to_string(), "USD/EUR 0.85");
    }
}
