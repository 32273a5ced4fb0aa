//! Thread-safe circuit breaker façade
//!
//! The façade owns the active state behind a single reader/writer lock.
//! Eligibility checks take the read lock, outcome updates and transitions
//! take the write lock, and the guarded operation itself runs with no lock
//! held. Hooks and callbacks run after the write lock is released.

use crate::{
    CircuitState, Counters, Outcome,
    builder::CircuitBuilder,
    callbacks::Callbacks,
    classifier::Classifier,
    clock::Clock,
    errors::CircuitError,
    state::{CircuitContext, StateMachine, Transition},
};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// How long the circuit stays Open before probing recovery
    pub reset_timeout: Duration,

    /// Failure rate (0.0-1.0) that must be exceeded to open the circuit
    pub failure_rate: f64,

    /// Number of calls sampled in HalfOpen before deciding
    pub half_open_probes: usize,

    /// Jitter factor for reset_timeout (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_timeout: Duration::from_secs(60),
            failure_rate: 0.5,
            half_open_probes: 5,
            jitter_factor: 0.0,
        }
    }
}

impl Config {
    /// Cooldown for a single Open entry
    ///
    /// Jitter is applied at microsecond resolution; a timeout shorter than
    /// one microsecond is used as is.
    pub fn cooldown(&self) -> Duration {
        let base_delay_us = u64::try_from(self.reset_timeout.as_micros()).unwrap_or(u64::MAX);
        if self.jitter_factor <= 0.0 || base_delay_us == 0 {
            return self.reset_timeout;
        }

        // The policy's arithmetic is unit-agnostic despite the field names
        let policy = chrono_machines::Policy {
            max_attempts: 1,
            base_delay_ms: base_delay_us,
            multiplier: 1.0,
            max_delay_ms: base_delay_us,
        };
        Duration::from_micros(policy.calculate_delay(1, self.jitter_factor))
    }
}

struct Shared {
    name: String,
    config: Config,
    classifier: Classifier,
    clock: Arc<dyn Clock>,
    callbacks: Callbacks,
    machine: RwLock<StateMachine>,
}

impl Shared {
    fn state(&self) -> CircuitState {
        self.machine.read().state()
    }

    fn record(self: &Arc<Self>, outcome: Outcome) {
        let (transition, generation) = {
            let mut machine = self.machine.write();

            // Admitted before a concurrent call tripped the circuit
            if machine.state() == CircuitState::Open {
                tracing::debug!(
                    circuit_breaker = %self.name,
                    outcome = ?outcome,
                    "Discarding outcome, circuit already open"
                );
                return;
            }

            machine.record(outcome);
            (machine.next(), machine.open_generation())
        };

        if let Some(transition) = transition {
            self.commit(transition, generation);
        }
    }

    fn force_open(self: &Arc<Self>) {
        let (transition, generation) = {
            let mut machine = self.machine.write();
            (machine.force_open(), machine.open_generation())
        };

        if let Some(transition) = transition {
            self.commit(transition, generation);
        }
    }

    fn reset(self: &Arc<Self>) {
        let transition = self.machine.write().reset();
        self.commit(transition, None);
    }

    /// Timer entry point for the Open → HalfOpen edge
    fn attempt_reset(self: &Arc<Self>, generation: u64) {
        let transition = self.machine.write().attempt_reset(generation);

        match transition {
            Some(transition) => self.commit(transition, None),
            None => tracing::debug!(
                circuit_breaker = %self.name,
                generation,
                "Ignoring stale reset timer"
            ),
        }
    }

    /// Post-transition work, run with the lock released
    fn commit(self: &Arc<Self>, transition: Transition, generation: Option<u64>) {
        if !transition.is_change() {
            return;
        }

        if transition.to == CircuitState::Open {
            tracing::warn!(
                circuit_breaker = %self.name,
                from_state = ?transition.from,
                to_state = ?transition.to,
                "Circuit breaker opened"
            );
            if let Some(generation) = generation {
                self.arm_reset_timer(generation);
            }
        } else {
            tracing::info!(
                circuit_breaker = %self.name,
                from_state = ?transition.from,
                to_state = ?transition.to,
                "Circuit breaker state transition"
            );
        }

        self.callbacks
            .trigger_transition(&self.name, transition.from, transition.to);
    }

    fn arm_reset_timer(self: &Arc<Self>, generation: u64) {
        let cooldown = self.config.cooldown();
        let shared = Arc::downgrade(self);

        tracing::debug!(
            circuit_breaker = %self.name,
            generation,
            cooldown_ms = cooldown.as_millis(),
            "Arming reset timer"
        );

        self.clock.after(
            cooldown,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.attempt_reset(generation);
                }
            }),
        );
    }
}

/// Circuit breaker public API
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker (use builder() for more options)
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        CircuitBuilder::new(name).config(config).build()
    }

    /// Create a new circuit breaker builder
    pub fn builder(name: impl Into<String>) -> CircuitBuilder {
        CircuitBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: String,
        config: Config,
        classifier: Classifier,
        clock: Arc<dyn Clock>,
        callbacks: Callbacks,
    ) -> Self {
        let machine = StateMachine::new(CircuitContext {
            name: name.clone(),
            config: config.clone(),
        });

        Self {
            shared: Arc::new(Shared {
                name,
                config,
                classifier,
                clock,
                callbacks,
                machine: RwLock::new(machine),
            }),
        }
    }

    /// Execute a fallible operation with circuit breaker protection
    ///
    /// While the circuit is Open the operation is not invoked and
    /// [`CircuitError::Open`] is returned. Otherwise the operation runs
    /// without any lock held and its result is returned unchanged, with
    /// errors wrapped in [`CircuitError::Execution`].
    pub fn call<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        if self.shared.state() == CircuitState::Open {
            tracing::debug!(circuit_breaker = %self.shared.name, "Call rejected, circuit open");
            return Err(CircuitError::Open {
                circuit: self.shared.name.clone(),
            });
        }

        let result = f();

        match self.shared.classifier.classify_result(&result) {
            Outcome::Ignored => {
                tracing::debug!(circuit_breaker = %self.shared.name, "Ignoring call outcome");
            }
            outcome => self.shared.record(outcome),
        }

        result.map_err(CircuitError::Execution)
    }

    /// Trip the circuit by hand; the reset timer is armed as usual
    pub fn force_open(&self) {
        self.shared.force_open();
    }

    /// Return to a fresh Closed state, disarming any pending reset timer
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.shared.state()
    }

    /// Get current state name, spelled as [`CircuitState`]'s `Display`
    pub fn state_name(&self) -> &'static str {
        self.state().as_str()
    }

    /// Outcome counters of the active state; `None` while Open
    pub fn counters(&self) -> Option<Counters> {
        self.shared.machine.read().counters()
    }

    /// Check if circuit is open
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Check if circuit is closed
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Check if circuit is half-open
    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("classifier", &self.shared.classifier)
            .field("clock", &self.shared.clock)
            .field("callbacks", &self.shared.callbacks)
            .field("machine", &*self.shared.machine.read())
            .finish()
    }
}
