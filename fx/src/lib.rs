//! RateBridge FX Engine
//!
//! Resilient rate retrieval and cross-rate computation.
//!
//! # Features
//!
//! - Mock and live rate providers behind one [`RateProvider`] trait
//! - Failure-counting circuit breaker with timed recovery probing
//! - Full pairwise rate matrix from a sparse base-relative rate set
//! - Fixed-precision conversion through the static currency registry
//!
//! # Example
//!
//! ```rust,ignore
//! use ratebridge_fx::{FxEngine, FxEngineConfig};
//!
//! let engine = FxEngine::new(FxEngineConfig::default());
//!
//! // Pairwise rates, unrounded
//! let matrix = engine.get_all_rates(&["USD", "EUR", "GBP"]).await?;
//!
//! // Conversion, rounded to the target currency's scale
//! let result = engine.convert("WBTC", "USDT", "1.0")?;
//! assert_eq!(result.amount.to_string(), "57094.314314");
//! ```

pub mod breaker;
pub mod conversion;
pub mod cross_rate;
pub mod engine;
pub mod error;
pub mod live;
pub mod provider;

pub use breaker::{BreakerSettings, BreakerState, CircuitBreaker, StateTransition};
pub use conversion::{ConversionRequest, Converter};
pub use cross_rate::{CrossRateCalculator, RateMatrix};
pub use engine::{FxEngine, FxEngineConfig, RatesMode};
pub use error::{FxError, FxResult};
pub use live::{LiveProviderConfig, LiveRateProvider};
pub use provider::{MockRateProvider, ProviderRates, RateProvider};
