//! Point-to-point conversion through the static currency registry.

use ratebridge_common::{
    to_presented_scale, Currency, CurrencyCode, CurrencyRegistry, ExchangeResult, MAX_SCALE,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};

/// A conversion request as it arrives from a transport.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
}

impl ConversionRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
        }
    }
}

/// Converts amounts using the registry's fixed USD rates. Never calls a
/// rate provider.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    registry: &'static CurrencyRegistry,
}

impl Converter {
    /// Converter over the standard registry.
    pub fn new() -> Self {
        Self::with_registry(CurrencyRegistry::standard())
    }

    pub fn with_registry(registry: &'static CurrencyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static CurrencyRegistry {
        self.registry
    }

    /// Convert `amount` of `from` into `to`.
    ///
    /// The result is `amount * usd_rate(from) / usd_rate(to)`, rounded half
    /// away from zero to the target's scale. Same-currency requests take the
    /// same path, so the amount comes back rounded.
    #[instrument(skip(self))]
    pub fn convert(&self, from: &str, to: &str, amount: &str) -> FxResult<ExchangeResult> {
        let from = CurrencyCode::new(from);
        let to = CurrencyCode::new(to);
        let amount = amount.trim();
        if from.is_empty() || to.is_empty() || amount.is_empty() {
            return Err(FxError::MissingParameters);
        }

        let value = parse_amount(amount)?;
        if value <= Decimal::ZERO {
            return Err(FxError::NonPositiveAmount);
        }

        let source = self.registry.lookup(from.code())?;
        let target = self.registry.lookup(to.code())?;

        let converted = bridge_through_usd(value, source, target).ok_or_else(|| {
            FxError::AmountOutOfRange {
                from: from.to_string(),
                to: to.to_string(),
            }
        })?;
        let amount = to_presented_scale(converted, target.decimal_places);

        debug!(%from, %to, %amount, "Converted amount");
        Ok(ExchangeResult { from, to, amount })
    }

    /// Convert a transport-level request.
    pub fn convert_request(&self, request: &ConversionRequest) -> FxResult<ExchangeResult> {
        self.convert(&request.from, &request.to, &request.amount)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a plain or scientific decimal. Digit separators and amounts finer
/// than the decimal type can hold are rejected rather than reinterpreted.
fn parse_amount(raw: &str) -> FxResult<Decimal> {
    let invalid = |reason: String| FxError::InvalidAmount(format!("{}: {}", raw, reason));

    if let Some(c) = raw
        .chars()
        .find(|c| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
    {
        return Err(invalid(format!("unexpected character '{}'", c)));
    }

    let mantissa = raw.split(|c| c == 'e' || c == 'E').next().unwrap_or(raw);
    if let Some((_, fraction)) = mantissa.split_once('.') {
        if fraction.len() > MAX_SCALE as usize {
            return Err(invalid(format!("more than {} decimal places", MAX_SCALE)));
        }
    }

    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| invalid(e.to_string()))?;

    // A non-zero mantissa that parsed to zero lost all of its precision.
    if value.is_zero() && mantissa.chars().any(|c| matches!(c, '1'..='9')) {
        return Err(invalid("too small to represent".to_string()));
    }
    Ok(value)
}

/// Unrounded `value * usd(from) / usd(to)`; `None` on overflow.
fn bridge_through_usd(value: Decimal, from: &Currency, to: &Currency) -> Option<Decimal> {
    value
        .checked_mul(from.rate_to_usd)?
        .checked_div(to.rate_to_usd)
}
