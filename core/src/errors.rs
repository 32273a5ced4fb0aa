//! Error types for circuit breaker operations

/// Errors returned by [`CircuitBreaker::call`](crate::CircuitBreaker::call)
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// Circuit is open, the operation was not invoked
    #[error("circuit '{circuit}' is open")]
    Open { circuit: String },
    /// The wrapped operation failed; the error is passed through verbatim
    #[error("circuit execution failed: {0}")]
    Execution(#[source] E),
}

impl<E> CircuitError<E> {
    /// Whether the call was rejected without running
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// Whether the operation ran and returned an error
    pub fn is_execution(&self) -> bool {
        matches!(self, CircuitError::Execution(_))
    }

    /// The operation's own error, if it ran
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            CircuitError::Open { .. } => None,
        }
    }
}
