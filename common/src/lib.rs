//! RateBridge Common Types
//!
//! Shared types used across RateBridge: the static currency registry,
//! fixed-point rounding helpers and the value objects produced by rate and
//! conversion requests.

pub mod currency;
pub mod error;
pub mod exchange;
pub mod monetary;

pub use currency::*;
pub use error::CurrencyError;
pub use exchange::*;
pub use monetary::*;
