// Audio timing - Sample-position clock shared with the output callback

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Shared audio timing state
///
/// The output callback advances the sample position; everything else reads
/// it as "seconds since the stream started". The sample rate is zero until a
/// device has been opened.
#[derive(Clone, Debug, Default)]
pub struct AudioTiming {
    /// Current sample position (incremented by audio callback)
    sample_position: Arc<AtomicU64>,
    /// Device sample rate in Hz, 0 while no stream is open
    sample_rate: Arc<AtomicU32>,
}

impl AudioTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timing already bound to a sample rate (offline use and tests)
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        let timing = Self::new();
        timing.set_sample_rate(sample_rate);
        timing
    }

    /// Get current sample position (called from the scheduling side)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::AcqRel);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    /// Bind to a device rate; the position keeps counting from where it was
    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Release);
    }

    /// Seconds elapsed on the audio clock
    pub fn seconds(&self) -> f64 {
        let rate = self.sample_rate();
        if rate == 0 {
            return 0.0;
        }
        self.current_sample() as f64 / rate as f64
    }

    /// Absolute sample position of a timestamp on the audio clock
    pub fn seconds_to_sample(&self, seconds: f64) -> u64 {
        let rate = self.sample_rate() as f64;
        (seconds.max(0.0) * rate).round() as u64
    }
}
