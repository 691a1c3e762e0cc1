// System clocks - Wall-clock and audio-device time sources
// Timers are always armed against `Instant`, the host loop sleeps on them

use super::{Clock, TimerHandle, TimerQueue};
use crate::audio::timing::AudioTiming;
use std::time::{Duration, Instant};

/// Monotonic wall clock (seconds since creation)
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    timers: TimerQueue<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            timers: TimerQueue::new(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn register_callback(&mut self, delay: Duration) -> TimerHandle {
        self.timers.arm(Instant::now() + delay)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        self.timers.take_due(Instant::now())
    }

    fn until_next_timer(&self) -> Option<Duration> {
        self.timers
            .next_due()
            .map(|due| due.saturating_duration_since(Instant::now()))
    }
}

/// Clock reading the output device's sample position
///
/// Timestamps handed to the audio sink are expressed on this clock, so the
/// sink can place every event on an exact sample.
#[derive(Debug, Clone)]
pub struct AudioClock {
    timing: AudioTiming,
    timers: TimerQueue<Instant>,
}

impl AudioClock {
    pub fn new(timing: AudioTiming) -> Self {
        Self {
            timing,
            timers: TimerQueue::new(),
        }
    }

    pub fn timing(&self) -> &AudioTiming {
        &self.timing
    }
}

impl Clock for AudioClock {
    fn now(&self) -> f64 {
        self.timing.seconds()
    }

    fn register_callback(&mut self, delay: Duration) -> TimerHandle {
        self.timers.arm(Instant::now() + delay)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        self.timers.take_due(Instant::now())
    }

    fn until_next_timer(&self) -> Option<Duration> {
        self.timers
            .next_due()
            .map(|due| due.saturating_duration_since(Instant::now()))
    }
}
