//! Circuit breaker state machine
//!
//! Three variants, each owning its own data:
//! - `Closed`: outcome counters since the circuit last closed
//! - `Open`: the generation stamp of this Open entry
//! - `HalfOpen`: outcome counters of the current probe round
//!
//! Counters never carry across a transition; entering a state always starts
//! from fresh data. This type is not synchronised; the façade serialises
//! access to it.

use crate::{CircuitState, Outcome, circuit::Config};
use state_machines::state_machine;

/// Outcome counters owned by a single state instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub failures: u64,
    pub total: u64,
}

impl Counters {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.total += 1,
            Outcome::Failure => {
                self.failures += 1;
                self.total += 1;
            }
            Outcome::Ignored => {}
        }
    }

    /// Failures over total; NaN while nothing was recorded
    pub fn failure_ratio(&self) -> f64 {
        self.failures as f64 / self.total as f64
    }

    /// Strictly above `threshold`; never true for empty counters
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.failure_ratio() > threshold
    }
}

/// Shared data visible to every state's guards
#[derive(Debug, Clone, Default)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
}

/// Data specific to the Closed state
#[derive(Debug, Clone, Default)]
pub struct ClosedData {
    pub counters: Counters,
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    /// Identifies this Open entry to the timer armed for it
    pub generation: u64,
}

/// Data specific to the HalfOpen state
#[derive(Debug, Clone, Default)]
pub struct HalfOpenData {
    pub counters: Counters,
}

state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed(ClosedData),
        Open(OpenData),
        HalfOpen(HalfOpenData),
    ],
    events {
        trip {
            guards: [should_open],
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        close {
            guards: [should_close],
            transition: { from: HalfOpen, to: Closed }
        }
        attempt_reset {
            transition: { from: Open, to: HalfOpen }
        }
        force_open {
            transition: { from: [Closed, HalfOpen], to: Open }
        }
    }
}

impl Circuit<Closed> {
    /// Cumulative failure rate since closing is above the threshold
    fn should_open(&self, ctx: &CircuitContext) -> bool {
        let data = self.state_data_closed().expect("Closed state must have data");
        data.counters.exceeds(ctx.config.failure_rate)
    }
}

impl Circuit<HalfOpen> {
    /// Probe quota reached and the probes failed too often
    fn should_open(&self, ctx: &CircuitContext) -> bool {
        let data = self
            .state_data_half_open()
            .expect("HalfOpen state must have data");
        probes_complete(&data.counters, &ctx.config)
            && data.counters.exceeds(ctx.config.failure_rate)
    }

    /// Probe quota reached and the probes mostly succeeded
    fn should_close(&self, ctx: &CircuitContext) -> bool {
        let data = self
            .state_data_half_open()
            .expect("HalfOpen state must have data");
        probes_complete(&data.counters, &ctx.config)
            && !data.counters.exceeds(ctx.config.failure_rate)
    }
}

fn probes_complete(counters: &Counters, config: &Config) -> bool {
    counters.total >= config.half_open_probes as u64
}

/// A committed change of the active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Owner of the active state
pub struct StateMachine {
    machine: DynamicCircuit,
    context: CircuitContext,
    generation: u64,
}

impl StateMachine {
    pub fn new(context: CircuitContext) -> Self {
        Self {
            machine: closed_machine(&context),
            context,
            generation: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.machine.current_state() {
            "Closed" => CircuitState::Closed,
            "Open" => CircuitState::Open,
            "HalfOpen" => CircuitState::HalfOpen,
            other => unreachable!("unknown circuit state {other}"),
        }
    }

    /// Counters of the active state; `None` while Open
    pub fn counters(&self) -> Option<Counters> {
        match self.state() {
            CircuitState::Closed => self.machine.closed_data().map(|d| d.counters),
            CircuitState::HalfOpen => self.machine.half_open_data().map(|d| d.counters),
            CircuitState::Open => None,
        }
    }

    /// Generation of the active Open entry
    pub fn open_generation(&self) -> Option<u64> {
        if self.state() != CircuitState::Open {
            return None;
        }
        self.machine.open_data().map(|d| d.generation)
    }

    /// Update the active state's counters
    ///
    /// # Panics
    ///
    /// Panics if the circuit is Open; callers must never admit a call then.
    pub fn record(&mut self, outcome: Outcome) {
        match self.state() {
            CircuitState::Closed => self
                .machine
                .closed_data_mut()
                .expect("Closed state must have data")
                .counters
                .record(outcome),
            CircuitState::HalfOpen => self
                .machine
                .half_open_data_mut()
                .expect("HalfOpen state must have data")
                .counters
                .record(outcome),
            CircuitState::Open => unreachable!("outcome recorded while the circuit is open"),
        }
    }

    /// Apply the active state's transition rule
    ///
    /// Open never leaves by itself; only [`StateMachine::attempt_reset`] does.
    pub fn next(&mut self) -> Option<Transition> {
        let from = self.state();
        let moved = match from {
            CircuitState::Closed => self.machine.handle(CircuitEvent::Trip).is_ok(),
            CircuitState::HalfOpen => {
                self.machine.handle(CircuitEvent::Trip).is_ok()
                    || self.machine.handle(CircuitEvent::Close).is_ok()
            }
            CircuitState::Open => false,
        };

        moved.then(|| self.entered(from))
    }

    /// Open → HalfOpen, only for the Open entry stamped with `generation`
    pub fn attempt_reset(&mut self, generation: u64) -> Option<Transition> {
        if self.open_generation() != Some(generation) {
            return None;
        }

        self.machine.handle(CircuitEvent::AttemptReset).ok()?;
        Some(self.entered(CircuitState::Open))
    }

    /// Enter Open regardless of the counters
    pub fn force_open(&mut self) -> Option<Transition> {
        let from = self.state();
        if from == CircuitState::Open {
            return None;
        }

        self.machine.handle(CircuitEvent::ForceOpen).ok()?;
        Some(self.entered(from))
    }

    /// Start over from a fresh Closed state
    ///
    /// The generation counter survives, so a timer armed before the reset
    /// can never match a later Open entry.
    pub fn reset(&mut self) -> Transition {
        let from = self.state();
        self.machine = closed_machine(&self.context);
        Transition {
            from,
            to: CircuitState::Closed,
        }
    }

    /// Fresh data for the state just entered
    fn entered(&mut self, from: CircuitState) -> Transition {
        let to = self.state();
        let seeded = match to {
            CircuitState::Closed => self.machine.set_closed_data(ClosedData::default()),
            CircuitState::HalfOpen => self.machine.set_half_open_data(HalfOpenData::default()),
            CircuitState::Open => {
                self.generation += 1;
                self.machine.set_open_data(OpenData {
                    generation: self.generation,
                })
            }
        };
        seeded.expect("entered state must accept its data");

        Transition { from, to }
    }
}

/// A machine in the initial Closed state with zeroed counters
///
/// The generated constructor leaves the initial state without data.
fn closed_machine(context: &CircuitContext) -> DynamicCircuit {
    let mut machine = DynamicCircuit::new(context.clone());
    machine
        .set_closed_data(ClosedData::default())
        .expect("new machine starts Closed");
    machine
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("circuit", &self.context.name)
            .field("state", &self.state())
            .field("counters", &self.counters())
            .field("generation", &self.generation)
            .finish()
    }
}
