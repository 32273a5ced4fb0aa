//! Timer sources used to schedule the Open → HalfOpen transition
//!
//! - `SystemClock`: real time, one sleeping thread per armed timer
//! - `MockClock`: virtual time advanced by hand, for tests

use parking_lot::Mutex;
use std::fmt;
use std::thread;
use std::time::Duration;

/// One-shot task run by a [`Clock`] when its timer fires
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Abstract one-shot scheduler
pub trait Clock: Send + Sync + fmt::Debug {
    /// Run `task` once, no earlier than `delay` from now
    ///
    /// Implementations must not run `task` on the calling thread before
    /// returning; callers may hold locks the task needs.
    fn after(&self, delay: Duration, task: TimerTask);
}

/// Wall-clock scheduler backed by sleeping threads
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn after(&self, delay: Duration, task: TimerTask) {
        let spawned = thread::Builder::new()
            .name("circuit-guard-timer".to_string())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });

        if let Err(e) = spawned {
            tracing::error!(
                delay_ms = delay.as_millis(),
                error = %e,
                "Failed to spawn circuit breaker timer thread"
            );
        }
    }
}

struct PendingTimer {
    deadline: Duration,
    seq: u64,
    task: TimerTask,
}

#[derive(Default)]
struct MockTimers {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
}

/// Manually driven clock; timers fire only from [`MockClock::advance`]
#[derive(Default)]
pub struct MockClock {
    timers: Mutex<MockTimers>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.timers.lock().now
    }

    /// Number of armed timers that have not fired yet
    pub fn pending(&self) -> usize {
        self.timers.lock().pending.len()
    }

    /// Move virtual time forward and run every timer that became due
    ///
    /// Tasks run in deadline order on the calling thread, after the clock's
    /// own lock is released. Timers armed by those tasks fire in the same
    /// call if they are already due.
    pub fn advance(&self, by: Duration) {
        {
            let mut timers = self.timers.lock();
            timers.now += by;
        }

        while let Some(task) = self.pop_due() {
            task();
        }
    }

    fn pop_due(&self) -> Option<TimerTask> {
        let mut timers = self.timers.lock();
        let now = timers.now;

        let index = timers
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;

        Some(timers.pending.swap_remove(index).task)
    }
}

impl Clock for MockClock {
    fn after(&self, delay: Duration, task: TimerTask) {
        let mut timers = self.timers.lock();
        let deadline = timers.now + delay;
        let seq = timers.next_seq;
        timers.next_seq += 1;
        timers.pending.push(PendingTimer {
            deadline,
            seq,
            task,
        });
    }
}

impl fmt::Debug for MockClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timers = self.timers.lock();
        f.debug_struct("MockClock")
            .field("now", &timers.now)
            .field("pending", &timers.pending.len())
            .finish()
    }
}
