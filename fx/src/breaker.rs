//! Failure-counting circuit breaker for the live rates provider.
//!
//! # States
//! - Closed: calls pass through; consecutive failures are counted
//! - Open: calls fail fast without touching the network
//! - Half-Open: a bounded number of trial calls test for recovery
//!
//! # Transitions
//! ```text
//! Closed    -> Open:      consecutive failures reach the threshold within the interval
//! Open      -> Half-Open: open timeout elapses (checked lazily on the next call)
//! Half-Open -> Closed:    a trial call succeeds
//! Half-Open -> Open:      a trial call fails, or a call arrives once the trial quota is used
//! ```
//!
//! Every transition starts a new generation. Outcomes reported against an
//! older generation are ignored, so a slow call admitted while Closed cannot
//! close a breaker that has since tripped.

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Name carried on state-change events.
    pub name: String,
    /// Consecutive failures that trip a closed breaker.
    pub failure_threshold: u32,
    /// Counting window while closed. Counts reset when it elapses.
    /// Zero disables the reset.
    pub interval: Duration,
    /// Cool-down before an open breaker admits trial calls.
    pub open_timeout: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_max_requests: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: "openexchange-api".to_string(),
            failure_threshold: 3,
            interval: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            half_open_max_requests: 3,
        }
    }
}

/// Call counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}

/// A state change, delivered to the state-change hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub breaker: String,
    pub from: BreakerState,
    pub to: BreakerState,
}

/// Observer invoked after every transition, outside the breaker's lock.
pub type StateChangeHook = Arc<dyn Fn(&StateTransition) + Send + Sync>;

/// Why the breaker refused to run a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("circuit breaker is open")]
    Open,
    #[error("too many requests while circuit breaker is half-open")]
    TooManyRequests,
}

/// Outcome of [`CircuitBreaker::call`] when it does not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// Refused by the breaker; the operation never ran.
    Rejected(Rejection),
    /// The operation ran and failed.
    Failed(E),
}

struct Inner {
    state: BreakerState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
    changed_at: Instant,
}

/// Shared circuit breaker. Wrap in an `Arc` and inject it where it is used.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<Inner>,
    on_state_change: Option<StateChangeHook>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(settings: BreakerSettings) -> Self {
        let now = Instant::now();
        let expiry = (!settings.interval.is_zero()).then(|| now + settings.interval);
        Self {
            settings,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
                changed_at: now,
            }),
            on_state_change: None,
        }
    }

    /// Attach an observer for state transitions.
    pub fn with_state_change_hook(mut self, hook: StateChangeHook) -> Self {
        self.on_state_change = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Current state, applying any transition that is due.
    pub fn state(&self) -> BreakerState {
        let mut events = Vec::new();
        let state = {
            let mut inner = self.inner.lock();
            self.refresh(&mut inner, Instant::now(), &mut events);
            inner.state
        };
        self.emit(events);
        state
    }

    /// Counters for the current generation.
    pub fn counts(&self) -> Counts {
        let mut events = Vec::new();
        let counts = {
            let mut inner = self.inner.lock();
            self.refresh(&mut inner, Instant::now(), &mut events);
            inner.counts
        };
        self.emit(events);
        counts
    }

    /// When the breaker last changed state.
    pub fn last_transition_at(&self) -> Instant {
        self.inner.lock().changed_at
    }

    /// Run `op` through the breaker.
    ///
    /// `op` is only invoked once the call is admitted, so a rejected call
    /// performs no work at all. If the returned future is dropped before it
    /// completes, the call is recorded as a failure.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.before_request().map_err(CallError::Rejected)?;
        let mut guard = CallGuard {
            breaker: self,
            generation,
            settled: false,
        };

        let result = op().await;
        guard.settle(result.is_ok());
        result.map_err(CallError::Failed)
    }

    fn before_request(&self) -> Result<u64, Rejection> {
        let mut events = Vec::new();
        let admitted = {
            let mut inner = self.inner.lock();
            let now = Instant::now();
            self.refresh(&mut inner, now, &mut events);

            match inner.state {
                BreakerState::Open => Err(Rejection::Open),
                BreakerState::HalfOpen
                    if inner.counts.requests >= self.settings.half_open_max_requests =>
                {
                    self.set_state(&mut inner, BreakerState::Open, now, &mut events);
                    Err(Rejection::TooManyRequests)
                }
                _ => {
                    inner.counts.on_request();
                    Ok(inner.generation)
                }
            }
        };
        self.emit(events);

        if let Err(rejection) = admitted {
            warn!(breaker = %self.settings.name, reason = %rejection, "Call rejected");
        }
        admitted
    }

    fn after_request(&self, generation: u64, success: bool) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            let now = Instant::now();
            self.refresh(&mut inner, now, &mut events);

            if generation != inner.generation {
                debug!(breaker = %self.settings.name, "Ignoring outcome from previous generation");
            } else if success {
                inner.counts.on_success();
                if inner.state == BreakerState::HalfOpen {
                    self.set_state(&mut inner, BreakerState::Closed, now, &mut events);
                }
            } else {
                inner.counts.on_failure();
                match inner.state {
                    BreakerState::Closed
                        if inner.counts.consecutive_failures >= self.settings.failure_threshold =>
                    {
                        self.set_state(&mut inner, BreakerState::Open, now, &mut events);
                    }
                    BreakerState::HalfOpen => {
                        self.set_state(&mut inner, BreakerState::Open, now, &mut events);
                    }
                    _ => {}
                }
            }
        }
        self.emit(events);
    }

    /// Apply time-driven changes: window reset while closed, cool-down
    /// expiry while open.
    fn refresh(&self, inner: &mut Inner, now: Instant, events: &mut Vec<StateTransition>) {
        let expired = inner.expiry.map_or(false, |expiry| expiry <= now);
        if !expired {
            return;
        }
        match inner.state {
            BreakerState::Closed => self.new_generation(inner, now),
            BreakerState::Open => self.set_state(inner, BreakerState::HalfOpen, now, events),
            BreakerState::HalfOpen => {}
        }
    }

    fn set_state(
        &self,
        inner: &mut Inner,
        to: BreakerState,
        now: Instant,
        events: &mut Vec<StateTransition>,
    ) {
        if inner.state == to {
            return;
        }
        let from = inner.state;
        inner.state = to;
        inner.changed_at = now;
        self.new_generation(inner, now);

        events.push(StateTransition {
            breaker: self.settings.name.clone(),
            from,
            to,
        });
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts = Counts::default();
        inner.expiry = match inner.state {
            BreakerState::Closed => {
                (!self.settings.interval.is_zero()).then(|| now + self.settings.interval)
            }
            BreakerState::Open => Some(now + self.settings.open_timeout),
            BreakerState::HalfOpen => None,
        };
    }

    fn emit(&self, events: Vec<StateTransition>) {
        for event in events {
            debug!(breaker = %event.breaker, from = %event.from, to = %event.to, "State transition");
            if let Some(hook) = &self.on_state_change {
                hook(&event);
            }
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.settings.name)
            .field("state", &inner.state)
            .field("counts", &inner.counts)
            .finish()
    }
}

/// Reports the outcome of an admitted call exactly once.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl CallGuard<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(breaker = %self.breaker.settings.name, "Call dropped before completion");
            self.breaker.after_request(self.generation, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_pending, assert_ready, task};

    type Events = Arc<Mutex<Vec<(BreakerState, BreakerState)>>>;

    fn breaker_with_events() -> (CircuitBreaker, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let breaker = CircuitBreaker::new(BreakerSettings::default())
            .with_state_change_hook(Arc::new(move |t: &StateTransition| {
                sink.lock().push((t.from, t.to));
            }));
        (breaker, events)
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<(), CallError<&'static str>> {
        breaker.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<(), CallError<&'static str>> {
        breaker.call(|| async { Ok::<(), &'static str>(()) }).await
    }

    async fn trip(breaker: &CircuitBreaker) {
        for _ in 0..3 {
            assert_eq!(fail(breaker).await, Err(CallError::Failed("boom")));
        }
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_three_consecutive_failures() {
        let (breaker, events) = breaker_with_events();
        let invoked = AtomicUsize::new(0);

        for _ in 0..2 {
            let _ = breaker
                .call(|| async {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("boom")
                })
                .await;
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        let _ = breaker
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom")
            })
            .await;
        assert_eq!(breaker.state(), BreakerState::Open);

        let fourth = breaker
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<(), &'static str>(())
            })
            .await;
        assert_eq!(fourth, Err(CallError::Rejected(Rejection::Open)));
        assert_eq!(invoked.load(Ordering::SeqCst), 3);
        assert_eq!(*events.lock(), vec![(BreakerState::Closed, BreakerState::Open)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());

        fail(&breaker).await.unwrap_err();
        fail(&breaker).await.unwrap_err();
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.counts().consecutive_failures, 0);

        fail(&breaker).await.unwrap_err();
        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.counts().total_failures, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_elapse_resets_counts() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());

        fail(&breaker).await.unwrap_err();
        fail(&breaker).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(61)).await;

        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.counts().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_until_timeout_then_half_open() {
        let (breaker, events) = breaker_with_events();
        trip(&breaker).await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(succeed(&breaker).await, Err(CallError::Rejected(Rejection::Open)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert_eq!(
            *events.lock(),
            vec![
                (BreakerState::Closed, BreakerState::Open),
                (BreakerState::Open, BreakerState::HalfOpen),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_trial_closes() {
        let (breaker, events) = breaker_with_events();
        trip(&breaker).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.counts(), Counts::default());
        assert_eq!(
            events.lock().last(),
            Some(&(BreakerState::HalfOpen, BreakerState::Closed))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        trip(&breaker).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(fail(&breaker).await, Err(CallError::Failed("boom")));
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(succeed(&breaker).await, Err(CallError::Rejected(Rejection::Open)));

        // A fresh cool-down starts from the failed trial.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_bounded_trials() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        trip(&breaker).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let mut trials: Vec<_> = (0..3)
            .map(|_| {
                task::spawn(
                    breaker.call(|| std::future::pending::<Result<(), &'static str>>()),
                )
            })
            .collect();
        for trial in trials.iter_mut() {
            assert_pending!(trial.poll());
        }
        assert_eq!(breaker.counts().requests, 3);

        let extra = succeed(&breaker).await;
        assert_eq!(extra, Err(CallError::Rejected(Rejection::TooManyRequests)));
        assert_eq!(breaker.state(), BreakerState::Open);

        // Trials admitted under the previous generation no longer count.
        drop(trials);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.counts().total_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_counts_as_failure() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        trip(&breaker).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let mut trial =
            task::spawn(breaker.call(|| std::future::pending::<Result<(), &'static str>>()));
        assert_pending!(trial.poll());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        drop(trial);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_calls_trip_closed_breaker() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        for _ in 0..3 {
            let mut call =
                task::spawn(breaker.call(|| std::future::pending::<Result<(), &'static str>>()));
            assert_pending!(call.poll());
        }
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_success_does_not_close() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let mut slow = task::spawn(breaker.call(|| async move {
            rx.await.map_err(|_| "sender dropped")
        }));
        assert_pending!(slow.poll());

        trip(&breaker).await;
        tx.send(()).unwrap();
        assert!(slow.is_woken());
        assert_eq!(assert_ready!(slow.poll()), Ok(()));
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_transition_time() {
        let breaker = CircuitBreaker::new(BreakerSettings::default());
        let created = breaker.last_transition_at();
        tokio::time::advance(Duration::from_secs(5)).await;
        trip(&breaker).await;
        assert_eq!(breaker.last_transition_at(), created + Duration::from_secs(5));
    }
}
