//! circuit-guard - call-guarding circuit breaker
//!
//! This crate wraps arbitrary fallible operations and stops invoking a
//! dependency once it keeps failing:
//! - State machine for the breaker lifecycle (Closed → Open → HalfOpen)
//! - Failure-rate tripping over the outcomes seen since entering a state
//! - Timer-driven recovery probes through a pluggable [`Clock`]
//! - Error reclassification with [`mark_ignorable`] and [`mark_successful`]
//! - Thread-safe façade; the guarded operation never runs under a lock
//!
//! # Example
//!
//! ```rust
//! use circuit_guard::{CircuitBreaker, CircuitError, CircuitState};
//! use std::time::Duration;
//!
//! let circuit = CircuitBreaker::builder("inventory")
//!     .failure_rate(0.5)
//!     .reset_timeout(Duration::from_secs(30))
//!     .half_open_probes(3)
//!     .on_transition(|from, to| println!("inventory: {from} -> {to}"))
//!     .build();
//!
//! let result = circuit.call(|| "42".parse::<u32>());
//! assert_eq!(result.ok(), Some(42));
//!
//! match circuit.call(|| "nope".parse::<u32>()) {
//!     Err(CircuitError::Execution(e)) => println!("call failed: {e}"),
//!     Err(CircuitError::Open { .. }) => println!("skipped, circuit open"),
//!     Ok(_) => unreachable!(),
//! }
//!
//! // One success, one failure: 1/2 is not above the 0.5 threshold
//! assert_eq!(circuit.state(), CircuitState::Closed);
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod classifier;
pub mod clock;
pub mod errors;
mod state;

pub use builder::CircuitBuilder;
pub use callbacks::{Callbacks, TransitionHook};
pub use circuit::{CircuitBreaker, Config};
pub use classifier::{
    BoxError, Classifier, ErrorPredicate, IgnorableError, SuccessfulError, mark_ignorable,
    mark_successful,
};
pub use clock::{Clock, MockClock, SystemClock, TimerTask};
pub use errors::CircuitError;
pub use state::Counters;

use std::fmt;

/// Label of the state a circuit breaker is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Calls flow through; failures accumulate toward the trip threshold
    Closed,
    /// Calls are rejected until the reset timeout fires
    Open,
    /// A limited number of probe calls decide between Closed and Open
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single guarded call is accounted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Counts toward the total only
    Success,
    /// Counts toward both the failures and the total
    Failure,
    /// Excluded from bookkeeping entirely
    Ignored,
}
