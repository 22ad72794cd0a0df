//! Static registry of supported currencies.
//!
//! The registry is built once and never mutated. Each entry fixes the scale
//! amounts in that currency are presented at and its rate against USD; the
//! converter bridges every pair through USD using these rates alone.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CurrencyError, Result};
use crate::monetary::{round_half_away, CurrencyCode, MAX_SCALE};

/// A supported currency and its fixed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Upper-case symbol, unique within a registry.
    pub code: CurrencyCode,
    /// Scale amounts in this currency are rounded to.
    pub decimal_places: u32,
    /// Value of one unit in USD.
    pub rate_to_usd: Decimal,
}

impl Currency {
    /// Create a currency, enforcing its invariants.
    pub fn new(code: impl AsRef<str>, decimal_places: u32, rate_to_usd: Decimal) -> Result<Self> {
        let currency = Self {
            code: CurrencyCode::new(code),
            decimal_places,
            rate_to_usd,
        };
        currency.validate()?;
        Ok(currency)
    }

    /// Check the code is present and the USD rate positive.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn validate(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(CurrencyError::InvalidCurrency {
                code: String::new(),
                reason: "code cannot be empty".to_string(),
            });
        }
        if self.rate_to_usd <= Decimal::ZERO {
            return Err(CurrencyError::InvalidCurrency {
                code: self.code.to_string(),
                reason: format!("rate to USD must be positive, got {}", self.rate_to_usd),
            });
        }
        if self.decimal_places > MAX_SCALE {
            return Err(CurrencyError::InvalidCurrency {
                code: self.code.to_string(),
                reason: format!("decimal places cannot exceed {}", MAX_SCALE),
            });
        }
        Ok(())
    }

    /// Round an amount to this currency's scale.
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_half_away(amount, self.decimal_places)
    }
}

/// Immutable lookup table of currencies keyed by code.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

static STANDARD: Lazy<CurrencyRegistry> = Lazy::new(|| {
    let entries = [
        ("BEER", 18, Decimal::new(2461, 8)),
        ("FLOKI", 18, Decimal::new(1428, 7)),
        ("GATE", 18, Decimal::new(687, 2)),
        ("USDT", 6, Decimal::new(999, 3)),
        ("WBTC", 8, Decimal::new(5703722, 2)),
    ];

    let mut currencies = BTreeMap::new();
    for (code, decimal_places, rate_to_usd) in entries {
        let currency = Currency {
            code: CurrencyCode::new(code),
            decimal_places,
            rate_to_usd,
        };
        currencies.insert(currency.code.clone(), currency);
    }
    CurrencyRegistry { currencies }
});

impl CurrencyRegistry {
    /// Build a registry from a list of currencies.
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for currency in currencies {
            currency.validate()?;
            if map.contains_key(&currency.code) {
                return Err(CurrencyError::DuplicateCurrency(currency.code.to_string()));
            }
            map.insert(currency.code.clone(), currency);
        }
        Ok(Self { currencies: map })
    }

    /// The process-wide registry of supported currencies.
    pub fn standard() -> &'static CurrencyRegistry {
        &STANDARD
    }

    /// Look up a currency by code, ignoring case and surrounding whitespace.
    pub fn lookup(&self, code: &str) -> Result<&Currency> {
        let code = CurrencyCode::new(code);
        self.currencies
            .get(&code)
            .ok_or_else(|| CurrencyError::UnknownCurrency(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.currencies.contains_key(&CurrencyCode::new(code))
    }

    /// Supported codes in ascending order.
    pub fn codes(&self) -> Vec<CurrencyCode> {
        self.currencies.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_registry_values() {
        let registry = CurrencyRegistry::standard();
        assert_eq!(registry.len(), 5);

        let expected = [
            ("BEER", 18, dec!(0.00002461)),
            ("FLOKI", 18, dec!(0.0001428)),
            ("GATE", 18, dec!(6.87)),
            ("USDT", 6, dec!(0.999)),
            ("WBTC", 8, dec!(57037.22)),
        ];
        for (code, places, rate) in expected {
            let currency = registry.lookup(code).unwrap();
            assert_eq!(currency.decimal_places, places, "{}", code);
            assert_eq!(currency.rate_to_usd, rate, "{}", code);
            assert!(currency.is_valid());
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CurrencyRegistry::standard();
        assert_eq!(registry.lookup("wbtc").unwrap().code.code(), "WBTC");
        assert_eq!(registry.lookup(" Usdt ").unwrap().decimal_places, 6);
        assert!(registry.contains("gate"));
    }

    #[test]
    fn test_unknown_currency() {
        let registry = CurrencyRegistry::standard();
        let err = registry.lookup("matic").unwrap_err();
        assert_eq!(err, CurrencyError::UnknownCurrency("MATIC".to_string()));
        assert_eq!(err.to_string(), "unsupported currency MATIC");
        assert_eq!(err.error_code(), "UNSUPPORTED_CURRENCY");
    }

    #[test]
    fn test_currency_invariants() {
        assert!(Currency::new("", 2, dec!(1)).is_err());
        assert!(Currency::new("ZERO", 2, Decimal::ZERO).is_err());
        assert!(Currency::new("NEG", 2, dec!(-1)).is_err());
        assert!(Currency::new("WIDE", 29, dec!(1)).is_err());
        assert!(Currency::new("ok", 2, dec!(1)).is_ok());
    }

    #[test]
    fn test_custom_registry_rejects_duplicates() {
        let a = Currency::new("AAA", 2, dec!(1)).unwrap();
        let b = Currency::new("aaa", 4, dec!(2)).unwrap();
        let err = CurrencyRegistry::new(vec![a, b]).unwrap_err();
        assert_eq!(err, CurrencyError::DuplicateCurrency("AAA".to_string()));
    }

    #[test]
    fn test_codes_are_sorted() {
        let codes: Vec<String> = CurrencyRegistry::standard()
            .codes()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(codes, vec!["BEER", "FLOKI", "GATE", "USDT", "WBTC"]);
    }

    #[test]
    fn test_currency_round() {
        let usdt = CurrencyRegistry::standard().lookup("USDT").unwrap();
        assert_eq!(usdt.round(dec!(1.0000005)), dec!(1.000001));
    }
}
