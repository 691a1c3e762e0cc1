// Manual clock - Deterministic simulated time for tests and offline runs

use super::{Clock, TimerHandle, TimerQueue};
use std::time::Duration;

/// Clock whose time only moves when told to
///
/// Used by the test suite and the `simulate` command to drive the scheduler
/// with arbitrary (jittery) timer firing instants.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: f64,
    timers: TimerQueue<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at `now` seconds
    pub fn starting_at(now: f64) -> Self {
        Self {
            now,
            timers: TimerQueue::new(),
        }
    }

    /// Move time forward by `seconds` (negative values are ignored)
    pub fn advance(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.now += seconds;
        }
    }

    /// Move time to `t`, never backwards
    pub fn advance_to(&mut self, t: f64) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Deadline of the earliest armed timer
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_due()
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now
    }

    fn register_callback(&mut self, delay: Duration) -> TimerHandle {
        self.timers.arm(self.now + delay.as_secs_f64())
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        self.timers.take_due(self.now)
    }

    fn until_next_timer(&self) -> Option<Duration> {
        self.timers
            .next_due()
            .map(|due| Duration::from_secs_f64((due - self.now).max(0.0)))
    }
}
