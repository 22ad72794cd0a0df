//! Request counters for service monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ratebridge_fx::FxError;
use serde::Serialize;

/// Service metrics.
pub struct Metrics {
    /// Rates requests received.
    pub rates_requests: AtomicU64,
    /// Rates requests answered successfully.
    pub rates_success: AtomicU64,
    /// Conversion requests received.
    pub conversions: AtomicU64,
    /// Conversion requests answered successfully.
    pub conversions_success: AtomicU64,
    /// Requests rejected by input validation.
    pub validation_failures: AtomicU64,
    /// Requests refused by the circuit breaker.
    pub breaker_rejections: AtomicU64,
    /// Requests failed by the upstream provider.
    pub provider_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            rates_requests: AtomicU64::new(0),
            rates_success: AtomicU64::new(0),
            conversions: AtomicU64::new(0),
            conversions_success: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            breaker_rejections: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
        }
    }

    pub fn rates_requested(&self) {
        self.rates_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rates_succeeded(&self) {
        self.rates_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn conversion_requested(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn conversion_succeeded(&self) {
        self.conversions_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request under the counter for its error class.
    pub fn record_failure(&self, err: &FxError) {
        let counter = if err.is_validation() {
            &self.validation_failures
        } else if err.is_breaker_rejection() {
            &self.breaker_rejections
        } else {
            &self.provider_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rates_requests: self.rates_requests.load(Ordering::Relaxed),
            rates_success: self.rates_success.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            conversions_success: self.conversions_success.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            breaker_rejections: self.breaker_rejections.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rates_requests: u64,
    pub rates_success: u64,
    pub conversions: u64,
    pub conversions_success: u64,
    pub validation_failures: u64,
    pub breaker_rejections: u64,
    pub provider_failures: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
