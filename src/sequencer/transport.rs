// Transport - Playback control surface
// Owns the song, the scheduler and its collaborators; every call is
// synchronous and returns immediately

use super::error::SequencerResult;
use super::scheduler::{PlaybackScheduler, PlaybackSession, SchedulerConfig, SchedulerState};
use super::store::PatternStore;
use super::timeline::{Tempo, TimeSignature};
use crate::audio::sink::EventSink;
use crate::clock::{Clock, TimerHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Transport controller
/// Owns the musical context (tempo, default meter) and the pattern store
///
/// Several transports can coexist; each has its own clock, sink and session.
pub struct Transport<C: Clock, S: EventSink> {
    store: PatternStore,
    scheduler: PlaybackScheduler,
    clock: C,
    sink: S,
    tempo: Tempo,
    default_time_signature: TimeSignature,
}

impl<C: Clock, S: EventSink> Transport<C, S> {
    /// Create new transport with an empty song and default timing
    pub fn new(clock: C, sink: S) -> Self {
        Self {
            store: PatternStore::new(),
            scheduler: PlaybackScheduler::default(),
            clock,
            sink,
            tempo: Tempo::default(),
            default_time_signature: TimeSignature::default(),
        }
    }

    /// Create with an existing song and custom scheduler timing
    pub fn with_config(
        clock: C,
        sink: S,
        store: PatternStore,
        config: SchedulerConfig,
    ) -> SequencerResult<Self> {
        Ok(Self {
            store,
            scheduler: PlaybackScheduler::new(config)?,
            clock,
            sink,
            tempo: Tempo::default(),
            default_time_signature: TimeSignature::default(),
        })
    }

    /// Start playback of the active section (restarts if already running)
    pub fn start(&mut self) -> SequencerResult<()> {
        self.scheduler.start(
            &self.store,
            self.tempo,
            self.default_time_signature,
            &mut self.clock,
            &mut self.sink,
        )
    }

    /// Stop playback; returns false if already stopped
    pub fn stop(&mut self) -> bool {
        self.scheduler.stop(&mut self.clock, &mut self.sink)
    }

    /// Get current state
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Counters of the running session
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.scheduler.session()
    }

    /// Get tempo
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Set tempo in BPM; applies from the next poll
    pub fn set_tempo(&mut self, bpm: f64) -> SequencerResult<()> {
        self.tempo = Tempo::new(bpm)?;
        debug!("tempo set to {}", self.tempo);
        Ok(())
    }

    /// Meter used for new sections and metronome-only playback
    pub fn default_time_signature(&self) -> TimeSignature {
        self.default_time_signature
    }

    /// Change the default meter; while running the bar restarts at its first beat
    pub fn set_default_time_signature(&mut self, time_signature: TimeSignature) {
        self.default_time_signature = time_signature;
        if self
            .scheduler
            .reset_meter(&self.store, self.default_time_signature)
        {
            info!("meter reset to {}", time_signature);
        }
    }

    /// Select the section to play; takes effect on the next start or resync
    pub fn set_active_section(&mut self, index: Option<usize>) -> SequencerResult<()> {
        self.store.set_active(index)
    }

    /// Switch a running session to the current active section
    pub fn resync(&mut self) -> bool {
        self.scheduler
            .resync(&self.store, self.default_time_signature)
    }

    /// Run the poll owned by `handle`; stale handles are ignored
    pub fn handle_timer(&mut self, handle: TimerHandle) -> bool {
        self.scheduler.on_timer(
            handle,
            &self.store,
            self.tempo,
            &mut self.clock,
            &mut self.sink,
        )
    }

    /// Run every timer the clock reports as due; returns how many were handled
    pub fn dispatch_due(&mut self) -> usize {
        let due = self.clock.take_due();
        due.into_iter()
            .filter(|&handle| self.handle_timer(handle))
            .count()
    }

    /// Time left until the next poll
    pub fn until_next_timer(&self) -> Option<Duration> {
        self.clock.until_next_timer()
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    /// Mutable song access; bit edits are heard from the next poll
    pub fn store_mut(&mut self) -> &mut PatternStore {
        &mut self.store
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
