//! Builder API for ergonomic circuit breaker configuration

use crate::{
    CircuitState,
    callbacks::Callbacks,
    circuit::{CircuitBreaker, Config},
    classifier::Classifier,
    clock::{Clock, SystemClock},
};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating circuit breakers with fluent API
///
/// Scalar options are last-write-wins; [`CircuitBuilder::on_transition`]
/// appends. Values are taken as given, see [`CircuitBuilder::build`].
pub struct CircuitBuilder {
    name: String,
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    classifier: Classifier,
    callbacks: Callbacks,
}

impl CircuitBuilder {
    /// Create a new builder for a circuit with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            clock: None,
            classifier: Classifier::new(),
            callbacks: Callbacks::new(),
        }
    }

    /// Replace all scalar settings at once
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the clock used to schedule the Open → HalfOpen timer
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set how long the circuit stays open before probing
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    /// Set the failure rate threshold (0.0-1.0)
    /// Circuit opens when (failures / total_calls) > this value
    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.config.failure_rate = rate;
        self
    }

    /// Set the number of calls sampled in HalfOpen before deciding
    pub fn half_open_probes(mut self, probes: usize) -> Self {
        self.config.half_open_probes = probes;
        self
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.config.jitter_factor = factor;
        self
    }

    /// Add a hook called with `(old, new)` on every state change
    ///
    /// Hooks run synchronously on the thread that caused the transition
    /// and should return quickly.
    pub fn on_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.callbacks.hooks.push(Arc::new(f));
        self
    }

    /// Set callback for when circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit closes
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Replace the check deciding which errors count as successful calls
    ///
    /// # Examples
    ///
    /// ```rust
    /// use circuit_guard::CircuitBreaker;
    /// use std::io;
    ///
    /// // A missing record says nothing about the backend's health
    /// let circuit = CircuitBreaker::builder("users")
    ///     .is_successful(|err| {
    ///         err.downcast_ref::<io::Error>()
    ///             .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    ///     })
    ///     .build();
    ///
    /// for _ in 0..10 {
    ///     let _ = circuit.call(|| Err::<(), _>(io::Error::from(io::ErrorKind::NotFound)));
    /// }
    /// assert!(circuit.is_closed());
    /// ```
    pub fn is_successful<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.classifier = self.classifier.with_successful(Arc::new(predicate));
        self
    }

    /// Replace the check deciding which errors are left out of bookkeeping
    pub fn is_ignorable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.classifier = self.classifier.with_ignorable(Arc::new(predicate));
        self
    }

    /// Build the circuit breaker
    ///
    /// Out-of-range values are accepted and only logged: a failure rate
    /// outside (0, 1] or a probe quota of zero still produce a working,
    /// if unusual, breaker.
    pub fn build(self) -> CircuitBreaker {
        if !(self.config.failure_rate > 0.0 && self.config.failure_rate <= 1.0) {
            tracing::warn!(
                circuit_breaker = %self.name,
                failure_rate = self.config.failure_rate,
                "Failure rate outside (0, 1]"
            );
        }
        if self.config.half_open_probes == 0 {
            tracing::warn!(
                circuit_breaker = %self.name,
                "Half-open probe quota is zero, first probe decides"
            );
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        CircuitBreaker::from_parts(
            self.name,
            self.config,
            self.classifier,
            clock,
            self.callbacks,
        )
    }
}

impl std::fmt::Debug for CircuitBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("classifier", &self.classifier)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockClock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn test_builder_defaults() {
        let circuit = CircuitBuilder::new("test").build();

        assert_eq!(circuit.state_name(), "closed");
        assert!(circuit.is_closed());
        assert_eq!(circuit.config().reset_timeout, Duration::from_secs(60));
        assert_eq!(circuit.config().failure_rate, 0.5);
        assert_eq!(circuit.config().half_open_probes, 5);
    }

    #[test]
    fn test_builder_custom_config() {
        let circuit = CircuitBuilder::new("test")
            .reset_timeout(Duration::from_secs(5))
            .failure_rate(0.25)
            .half_open_probes(3)
            .jitter_factor(0.1)
            .build();

        let config = circuit.config();
        assert_eq!(config.reset_timeout, Duration::from_secs(5));
        assert_eq!(config.failure_rate, 0.25);
        assert_eq!(config.half_open_probes, 3);
        assert_eq!(config.jitter_factor, 0.1);
    }

    #[test]
    fn test_builder_last_write_wins() {
        let circuit = CircuitBuilder::new("test")
            .failure_rate(0.9)
            .config(Config {
                half_open_probes: 7,
                ..Default::default()
            })
            .failure_rate(0.3)
            .build();

        assert_eq!(circuit.config().failure_rate, 0.3);
        assert_eq!(circuit.config().half_open_probes, 7);
    }

    #[test]
    fn test_builder_accepts_unusual_values() {
        let clock = Arc::new(MockClock::new());
        let circuit = CircuitBuilder::new("test")
            .clock(clock.clone())
            .failure_rate(1.5)
            .half_open_probes(0)
            .build();

        // A rate above 1 can never be exceeded
        for _ in 0..10 {
            let _ = circuit.call(|| Err::<(), _>(std::io::Error::other("down")));
        }
        assert!(circuit.is_closed());
        assert_eq!(circuit.config().half_open_probes, 0);
    }

    #[test]
    fn test_builder_with_callbacks() {
        let clock = Arc::new(MockClock::new());
        let opened = Arc::new(AtomicBool::new(false));
        let half_opened = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        let hooks = Arc::new(AtomicUsize::new(0));

        let opened_clone = opened.clone();
        let half_opened_clone = half_opened.clone();
        let closed_clone = closed.clone();
        let hooks_clone = hooks.clone();

        let circuit = CircuitBuilder::new("test")
            .clock(clock.clone())
            .half_open_probes(1)
            .on_open(move |_name| opened_clone.store(true, Ordering::SeqCst))
            .on_half_open(move |_name| half_opened_clone.store(true, Ordering::SeqCst))
            .on_close(move |_name| closed_clone.store(true, Ordering::SeqCst))
            .on_transition(move |_, _| {
                hooks_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        // Trigger a failure to open circuit
        let _ = circuit.call(|| Err::<(), _>(std::io::Error::other("error 1")));
        assert!(opened.load(Ordering::SeqCst));

        clock.advance(Duration::from_secs(60));
        assert!(half_opened.load(Ordering::SeqCst));

        let _ = circuit.call(|| Ok::<_, std::io::Error>(()));
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(hooks.load(Ordering::SeqCst), 3);
    }
}
