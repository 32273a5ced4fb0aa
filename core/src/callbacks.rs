//! Callback system for circuit breaker state transitions

use crate::CircuitState;
use std::sync::Arc;

/// Observer invoked with `(old, new)` after every genuine state change
pub type TransitionHook = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// Callbacks for circuit breaker events
#[derive(Clone)]
pub struct Callbacks {
    pub hooks: Vec<TransitionHook>,
    pub on_open: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_close: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_half_open: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            on_open: None,
            on_close: None,
            on_half_open: None,
        }
    }

    /// Notify observers of a committed transition
    ///
    /// Transition hooks run first, in registration order, followed by the
    /// callback for the state that was entered. Same-state "transitions"
    /// are dropped here.
    pub fn trigger_transition(&self, circuit: &str, from: CircuitState, to: CircuitState) {
        if from == to {
            return;
        }

        for hook in &self.hooks {
            hook(from, to);
        }

        match to {
            CircuitState::Open => self.trigger_open(circuit),
            CircuitState::Closed => self.trigger_close(circuit),
            CircuitState::HalfOpen => self.trigger_half_open(circuit),
        }
    }

    pub fn trigger_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_open {
            callback(circuit);
        }
    }

    pub fn trigger_close(&self, circuit: &str) {
        if let Some(ref callback) = self.on_close {
            callback(circuit);
        }
    }

    pub fn trigger_half_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_half_open {
            callback(circuit);
        }
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("hooks", &self.hooks.len())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_hooks_run_in_order_then_state_callback() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut callbacks = Callbacks::new();

        let log = events.clone();
        callbacks.hooks.push(Arc::new(move |from: CircuitState, to: CircuitState| {
            log.lock().push(format!("first {from}->{to}"))
        }));
        let log = events.clone();
        callbacks.hooks.push(Arc::new(move |from: CircuitState, to: CircuitState| {
            log.lock().push(format!("second {from}->{to}"))
        }));
        let log = events.clone();
        callbacks.on_open = Some(Arc::new(move |name: &str| {
            log.lock().push(format!("open {name}"))
        }));

        callbacks.trigger_transition("db", CircuitState::Closed, CircuitState::Open);

        assert_eq!(
            *events.lock(),
            vec![
                "first closed->open".to_string(),
                "second closed->open".to_string(),
                "open db".to_string(),
            ]
        );
    }

    #[test]
    fn test_same_state_does_not_fire() {
        let fired = Arc::new(Mutex::new(0));
        let mut callbacks = Callbacks::new();

        let counter = fired.clone();
        callbacks
            .hooks
            .push(Arc::new(move |_: CircuitState, _: CircuitState| {
                *counter.lock() += 1
            }));

        callbacks.trigger_transition("db", CircuitState::Closed, CircuitState::Closed);
        assert_eq!(*fired.lock(), 0);

        callbacks.trigger_transition("db", CircuitState::HalfOpen, CircuitState::Closed);
        assert_eq!(*fired.lock(), 1);
    }
}
