//! Fixed-point monetary helpers for RateBridge.
//!
//! All amounts and rates are [`Decimal`] values. Nothing in the workspace
//! touches binary floating point once a value has been parsed, and rounding
//! happens in exactly one place: [`round_half_away`] applied to the final
//! presented amount.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest scale a [`Decimal`] can carry.
pub const MAX_SCALE: u32 = 28;

/// Round `value` to `decimal_places`, resolving exact ties away from zero.
///
/// `0.125` at two places becomes `0.13`, `-0.125` becomes `-0.13`.
pub fn round_half_away(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

/// Round `value` and pad it so its scale equals `decimal_places` when
/// displayed (`100` at six places renders as `100.000000`).
///
/// Padding is best effort: a value whose integer part leaves no room for the
/// full scale keeps the widest scale that fits. The numeric value is the same
/// either way.
pub fn to_presented_scale(value: Decimal, decimal_places: u32) -> Decimal {
    let mut rounded = round_half_away(value, decimal_places);
    let target = decimal_places.min(MAX_SCALE);
    if rounded.scale() < target {
        rounded.rescale(target);
    }
    rounded
}

/// Normalised currency code (trimmed, upper-cased).
///
/// Serialized as a bare string. Deserialization goes through
/// [`CurrencyCode::new`], so `"usd"` reads back as `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a code from raw user input.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Get the code as a string slice.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
