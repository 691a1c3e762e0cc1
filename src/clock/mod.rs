// Clock - Monotonic time source plus cancellable one-shot timers
//
// The scheduler never sleeps or spawns anything itself: it asks the clock
// for the current time and arms a single timer for its next poll. The host
// loop drains fired timers with `take_due()` and hands each handle back to
// the transport, which ignores handles it no longer owns.

pub mod manual;
pub mod queue;
pub mod system;

pub use manual::ManualClock;
pub use queue::TimerQueue;
pub use system::{AudioClock, SystemClock};

use std::time::Duration;

/// Token for one armed callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Time source used by the playback scheduler
pub trait Clock {
    /// Current time in seconds; never decreases between calls
    fn now(&self) -> f64;

    /// Arm a one-shot callback `delay` from now
    fn register_callback(&mut self, delay: Duration) -> TimerHandle;

    /// Disarm a callback; fired or unknown handles are ignored
    fn cancel(&mut self, handle: TimerHandle);

    /// Remove and return every armed callback whose deadline has passed,
    /// earliest first
    fn take_due(&mut self) -> Vec<TimerHandle>;

    /// Time left until the earliest armed callback, `None` when idle
    fn until_next_timer(&self) -> Option<Duration>;
}
