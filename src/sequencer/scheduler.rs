// Playback scheduler - Lookahead loop turning the active pattern into timed triggers
//
// Each poll emits every step whose start time falls inside the lookahead
// window, stamped with its exact musical time, then arms a single timer for
// the next poll. Late or early timer firings only change how many steps a
// poll emits, never the timestamps themselves.

use super::error::{SequencerError, SequencerResult};
use super::section::{Section, SectionId};
use super::store::PatternStore;
use super::timeline::{StepGrid, Tempo, TimeSignature};
use crate::audio::sink::EventSink;
use crate::clock::{Clock, TimerHandle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Most steps a single poll emits; a poll that falls further behind catches
/// up over the following polls
pub const MAX_STEPS_PER_POLL: usize = 64;

/// Timing parameters of the lookahead loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How far ahead of `now` steps are emitted
    pub lookahead_ms: u64,
    /// Delay between two polls
    pub poll_interval_ms: u64,
    /// Gap between `start()` and the first step
    pub start_offset_ms: u64,
    /// Play an accented click at `now` when playback starts
    pub confirmation_click: bool,
}

impl SchedulerConfig {
    /// The window must outlast the poll interval or steps would be emitted late
    pub fn validate(&self) -> SequencerResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(SequencerError::InvalidSchedulerConfig(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.lookahead_ms <= self.poll_interval_ms {
            return Err(SequencerError::InvalidSchedulerConfig(format!(
                "lookahead ({} ms) must exceed the poll interval ({} ms)",
                self.lookahead_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_offset(&self) -> Duration {
        Duration::from_millis(self.start_offset_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: 120,
            poll_interval_ms: 25,
            start_offset_ms: 50,
            confirmation_click: false,
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Stopped,
    Running,
}

impl SchedulerState {
    pub fn is_running(&self) -> bool {
        matches!(self, SchedulerState::Running)
    }
}

/// Counters of one playback run, from `start()` to `stop()`
///
/// The grid and step count are snapshotted from the active section when the
/// session is created; later meter or length edits only apply after a
/// restart or an explicit resync.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    section: Option<SectionId>,
    grid: StepGrid,
    total_steps: usize,
    step_within_section: usize,
    tick_within_measure: usize,
    next_event_time: f64,
}

impl PlaybackSession {
    fn new(section: Option<&Section>, default_ts: TimeSignature, next_event_time: f64) -> Self {
        let mut session = Self {
            section: None,
            grid: default_ts.grid(),
            total_steps: 0,
            step_within_section: 0,
            tick_within_measure: 0,
            next_event_time,
        };
        session.snapshot(section, default_ts);
        session
    }

    /// Copy the section's grid, or fall back to metronome-only mode
    fn snapshot(&mut self, section: Option<&Section>, default_ts: TimeSignature) {
        match section {
            Some(section) => {
                self.section = Some(section.id());
                self.grid = section.grid();
                self.total_steps = section.total_steps();
            }
            None => {
                self.section = None;
                self.grid = default_ts.grid();
                self.total_steps = 0;
            }
        }
    }

    /// Section being played, `None` in metronome-only mode
    pub fn section_id(&self) -> Option<SectionId> {
        self.section
    }

    pub fn grid(&self) -> StepGrid {
        self.grid
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn step_within_section(&self) -> usize {
        self.step_within_section
    }

    pub fn tick_within_measure(&self) -> usize {
        self.tick_within_measure
    }

    /// Clock time of the next step to emit
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }
}

/// Lookahead playback scheduler
///
/// Owns at most one session and at most one armed timer. Handles it did not
/// arm (or already replaced) are ignored, so a timer firing after `stop()`
/// or a restart never schedules anything.
#[derive(Debug, Clone, Default)]
pub struct PlaybackScheduler {
    config: SchedulerConfig,
    session: Option<PlaybackSession>,
    pending: Option<TimerHandle>,
}

impl PlaybackScheduler {
    /// Create a stopped scheduler, rejecting invalid timing parameters
    pub fn new(config: SchedulerConfig) -> SequencerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session: None,
            pending: None,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        if self.session.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Current session, `None` while stopped
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Timer armed for the next poll
    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending
    }

    /// Begin (or restart) playback of the active section
    ///
    /// On a sink failure nothing changes: a running session keeps running.
    pub fn start<C, S>(
        &mut self,
        store: &PatternStore,
        tempo: Tempo,
        default_ts: TimeSignature,
        clock: &mut C,
        sink: &mut S,
    ) -> SequencerResult<()>
    where
        C: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        sink.resume().map_err(|e| {
            warn!("cannot start playback: {}", e);
            SequencerError::AudioUnavailable(e.to_string())
        })?;

        if let Some(handle) = self.pending.take() {
            clock.cancel(handle);
        }
        if self.session.is_some() {
            info!("restarting playback");
            sink.flush();
        }

        let now = clock.now();
        let session = PlaybackSession::new(
            store.active_section(),
            default_ts,
            now + self.config.start_offset().as_secs_f64(),
        );
        match store.active_section() {
            Some(section) => info!(
                "playback started: {} at {} ({} steps)",
                section,
                tempo,
                session.total_steps()
            ),
            None => info!("playback started: metronome only, {} at {}", default_ts, tempo),
        }

        if self.config.confirmation_click {
            sink.play_click(true, now);
        }
        self.session = Some(session);
        self.poll(store, tempo, clock, sink);
        Ok(())
    }

    /// End playback and flush triggers the sink has not played yet;
    /// returns false if already stopped
    pub fn stop<C, S>(&mut self, clock: &mut C, sink: &mut S) -> bool
    where
        C: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        if let Some(handle) = self.pending.take() {
            clock.cancel(handle);
        }
        let was_running = self.session.take().is_some();
        if was_running {
            sink.flush();
            info!("playback stopped");
        }
        was_running
    }

    /// Run the poll owned by `handle`; returns false for stale handles
    pub fn on_timer<C, S>(
        &mut self,
        handle: TimerHandle,
        store: &PatternStore,
        tempo: Tempo,
        clock: &mut C,
        sink: &mut S,
    ) -> bool
    where
        C: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        if self.pending != Some(handle) {
            trace!("ignoring stale timer {}", handle.id());
            return false;
        }
        self.pending = None;
        self.poll(store, tempo, clock, sink);
        true
    }

    /// Re-snapshot the active section and restart counting from step 0
    ///
    /// The next step keeps its scheduled time, so the pulse does not jump.
    pub fn resync(&mut self, store: &PatternStore, default_ts: TimeSignature) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.snapshot(store.active_section(), default_ts);
        session.step_within_section = 0;
        session.tick_within_measure = 0;
        debug!(
            "resynced to {:?} ({} steps)",
            session.section, session.total_steps
        );
        true
    }

    /// Pick up a meter change and restart the bar at its first beat
    ///
    /// The played section stays the same; its grid (or the default meter in
    /// metronome-only mode) is read again.
    pub fn reset_meter(&mut self, store: &PatternStore, default_ts: TimeSignature) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let section = session.section.and_then(|id| store.section_by_id(id));
        session.snapshot(section, default_ts);
        session.step_within_section = match session.total_steps {
            0 => 0,
            total => session.step_within_section % total,
        };
        session.tick_within_measure = 0;
        debug!("meter reset to {} steps per bar", session.grid.steps_per_measure);
        true
    }

    /// Emit every step inside the lookahead window, then arm the next poll
    ///
    /// Returns the number of steps emitted.
    fn poll<C, S>(&mut self, store: &PatternStore, tempo: Tempo, clock: &mut C, sink: &mut S) -> usize
    where
        C: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let section = match session.section {
            Some(id) => {
                let section = store.section_by_id(id);
                if section.is_none() {
                    warn!("section {} was deleted during playback, continuing with metronome only", id);
                    session.section = None;
                    session.total_steps = 0;
                    session.step_within_section = 0;
                }
                section
            }
            None => None,
        };

        let seconds_per_step = tempo.step_duration_seconds(&session.grid);
        let now = clock.now();
        let horizon = now + self.config.lookahead().as_secs_f64();
        let mut emitted = 0;

        if session.next_event_time < now {
            warn!(
                "poll {:.1} ms late, emitting past steps",
                (now - session.next_event_time) * 1000.0
            );
        }

        while session.next_event_time < horizon && emitted < MAX_STEPS_PER_POLL {
            let t = session.next_event_time;

            if session.grid.is_beat(session.tick_within_measure) {
                sink.play_click(session.tick_within_measure == 0, t);
            }

            if let Some(section) = section
                && session.total_steps > 0
            {
                // Bits are read live; a step past a shrunk pattern is silent
                for instrument in section.pattern().hits_at(session.step_within_section) {
                    sink.play_sample(instrument, t);
                }
                session.step_within_section = (session.step_within_section + 1) % session.total_steps;
            }

            session.next_event_time += seconds_per_step;
            session.tick_within_measure =
                (session.tick_within_measure + 1) % session.grid.steps_per_measure;
            emitted += 1;
        }

        if emitted > 0 {
            trace!("poll emitted {} steps", emitted);
        }
        self.pending = Some(clock.register_callback(self.config.poll_interval()));
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::RecordingSink;
    use crate::clock::ManualClock;
    use crate::sequencer::pattern::Instrument;
    use crate::sequencer::section::Direction;

    const EPS: f64 = 1e-9;

    fn tempo(bpm: f64) -> Tempo {
        Tempo::new(bpm).unwrap()
    }

    /// Fire every due timer, advancing the clock in poll-interval hops until `until`
    fn run_until(
        scheduler: &mut PlaybackScheduler,
        store: &PatternStore,
        bpm: f64,
        clock: &mut ManualClock,
        sink: &mut RecordingSink,
        until: f64,
    ) {
        while let Some(deadline) = clock.next_deadline() {
            if deadline > until {
                break;
            }
            clock.advance_to(deadline);
            for handle in clock.take_due() {
                scheduler.on_timer(handle, store, tempo(bpm), clock, sink);
            }
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let config = SchedulerConfig {
            lookahead_ms: 25,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SequencerError::InvalidSchedulerConfig(_))
        ));
        let config = SchedulerConfig {
            poll_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert!(PlaybackScheduler::new(config).is_err());
    }

    #[test]
    fn test_start_emits_first_window() {
        let store = PatternStore::new();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();

        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();

        assert_eq!(scheduler.state(), SchedulerState::Running);
        // Only the step at 0.05 falls inside [0, 0.12)
        assert_eq!(sink.clicks(), vec![(true, 0.05)]);
        let session = scheduler.session().unwrap();
        assert_eq!(session.tick_within_measure(), 1);
        assert!((session.next_event_time() - 0.175).abs() < EPS);
        assert_eq!(clock.pending_timers(), 1);
        assert_eq!(clock.next_deadline(), Some(0.025));
    }

    #[test]
    fn test_start_failure_keeps_state() {
        let store = PatternStore::new();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::unavailable();
        let mut scheduler = PlaybackScheduler::default();

        let result = scheduler.start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink);
        assert!(matches!(result, Err(SequencerError::AudioUnavailable(_))));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(sink.events().is_empty());
        assert_eq!(clock.pending_timers(), 0);
        assert_eq!(sink.flush_count(), 0);
    }

    #[test]
    fn test_stop_cancels_and_ignores_stale_handle() {
        let store = PatternStore::new();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();

        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        let handle = scheduler.pending_timer().unwrap();

        assert!(scheduler.stop(&mut clock, &mut sink));
        assert!(!scheduler.stop(&mut clock, &mut sink));
        assert_eq!(sink.flush_count(), 1);
        assert_eq!(clock.pending_timers(), 0);

        sink.clear();
        clock.advance(1.0);
        assert!(!scheduler.on_timer(handle, &store, tempo(120.0), &mut clock, &mut sink));
        assert!(sink.events().is_empty());
        assert!(scheduler.session().is_none());
    }

    #[test]
    fn test_restart_while_running() {
        let mut store = PatternStore::new();
        let i = store.append_section("Verse", 1, TimeSignature::four_four());
        store.set_active(Some(i)).unwrap();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();

        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        run_until(&mut scheduler, &store, 120.0, &mut clock, &mut sink, 1.0);
        let old_handle = scheduler.pending_timer().unwrap();

        sink.clear();
        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();

        // Exactly one timer armed and counters back at the first step
        assert_eq!(clock.pending_timers(), 1);
        assert_ne!(scheduler.pending_timer(), Some(old_handle));
        assert_eq!(sink.clicks()[0], (true, clock.now() + 0.05));
        assert!(!scheduler.on_timer(old_handle, &store, tempo(120.0), &mut clock, &mut sink));
        // Triggers queued by the first session are dropped
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn test_late_poll_emits_bounded_batches() {
        let mut store = PatternStore::new();
        let i = store.append_section("Verse", 1, TimeSignature::four_four());
        store.set_step(i, Instrument::ClosedHat, 0, true).unwrap();
        store.set_active(Some(i)).unwrap();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();

        scheduler
            .start(&store, tempo(999.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        sink.clear();

        // The first timer fires a minute late
        clock.advance_to(60.0);
        let handle = clock.take_due()[0];
        assert!(scheduler.on_timer(handle, &store, tempo(999.0), &mut clock, &mut sink));
        assert_eq!(sink.clicks().len(), MAX_STEPS_PER_POLL / 4);
        assert_eq!(clock.pending_timers(), 1);
        assert!(scheduler.session().unwrap().next_event_time() < clock.now());

        // Following polls catch up without losing or moving a step
        run_until(&mut scheduler, &store, 999.0, &mut clock, &mut sink, 70.0);
        let session = scheduler.session().unwrap();
        assert!(session.next_event_time() >= clock.now());
        let step = 60.0 / 999.0 / 4.0;
        let clicks = sink.clicks();
        for pair in clicks.windows(2) {
            assert!((pair[1].1 - pair[0].1 - 4.0 * step).abs() < 1e-6);
        }
    }

    #[test]
    fn test_confirmation_click() {
        let store = PatternStore::new();
        let mut clock = ManualClock::starting_at(2.0);
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::new(SchedulerConfig {
            confirmation_click: true,
            ..SchedulerConfig::default()
        })
        .unwrap();

        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        let clicks = sink.clicks();
        assert_eq!(clicks[0], (true, 2.0));
        assert!((clicks[1].1 - 2.05).abs() < EPS);
    }

    #[test]
    fn test_steps_wrap_with_section_length() {
        let mut store = PatternStore::new();
        let i = store.append_section("Fill", 1, TimeSignature::three_four());
        store.set_active(Some(i)).unwrap();
        store.toggle_step(i, Instrument::Snare, 11).unwrap();

        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();
        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        // Two passes of 12 steps, 0.125s each
        run_until(&mut scheduler, &store, 120.0, &mut clock, &mut sink, 24.0 * 0.125);

        let snares = sink.samples();
        assert!(snares.len() >= 2);
        assert!((snares[0].1 - (0.05 + 11.0 * 0.125)).abs() < EPS);
        assert!((snares[1].1 - snares[0].1 - 1.5).abs() < EPS);
    }

    #[test]
    fn test_deleted_section_falls_back_to_metronome() {
        let mut store = PatternStore::new();
        let i = store.append_section("Verse", 1, TimeSignature::four_four());
        store.set_active(Some(i)).unwrap();
        store.toggle_step(i, Instrument::Kick, 0).unwrap();

        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();
        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        assert_eq!(sink.samples().len(), 1);

        store.delete_section(i).unwrap();
        sink.clear();
        run_until(&mut scheduler, &store, 120.0, &mut clock, &mut sink, 4.0);

        assert!(sink.samples().is_empty());
        assert!(!sink.clicks().is_empty());
        assert_eq!(scheduler.session().unwrap().section_id(), None);
    }

    #[test]
    fn test_moved_section_keeps_playing() {
        let mut store = PatternStore::new();
        store.append_section("Intro", 1, TimeSignature::four_four());
        let i = store.append_section("Verse", 1, TimeSignature::four_four());
        store.set_active(Some(i)).unwrap();
        store.toggle_step(i, Instrument::Crash, 0).unwrap();

        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();
        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        store.move_section(i, Direction::Up).unwrap();
        run_until(&mut scheduler, &store, 120.0, &mut clock, &mut sink, 2.5);

        let crashes = sink.samples();
        assert_eq!(crashes.len(), 2);
        assert!((crashes[1].1 - crashes[0].1 - 2.0).abs() < EPS);
    }

    #[test]
    fn test_resync_and_reset_meter() {
        let mut store = PatternStore::new();
        let a = store.append_section("A", 1, TimeSignature::four_four());
        let b = store.append_section("B", 2, TimeSignature::six_eight());
        store.set_active(Some(a)).unwrap();

        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();
        assert!(!scheduler.resync(&store, TimeSignature::four_four()));

        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        run_until(&mut scheduler, &store, 120.0, &mut clock, &mut sink, 0.6);
        let next_time = scheduler.session().unwrap().next_event_time();

        store.set_active(Some(b)).unwrap();
        assert!(scheduler.resync(&store, TimeSignature::four_four()));
        let session = scheduler.session().unwrap();
        assert_eq!(session.section_id(), Some(store.sections()[b].id()));
        assert_eq!(session.total_steps(), 24);
        assert_eq!(session.grid().steps_per_beat, 2);
        assert_eq!(session.step_within_section(), 0);
        assert_eq!(session.next_event_time(), next_time);

        store.set_time_signature(b, TimeSignature::three_four()).unwrap();
        assert!(scheduler.reset_meter(&store, TimeSignature::four_four()));
        let session = scheduler.session().unwrap();
        assert_eq!(session.total_steps(), 24);
        assert_eq!(session.grid().steps_per_measure, 12);
        assert_eq!(session.tick_within_measure(), 0);
    }

    #[test]
    fn test_metronome_only_reset_meter_uses_default() {
        let store = PatternStore::new();
        let mut clock = ManualClock::new();
        let mut sink = RecordingSink::new();
        let mut scheduler = PlaybackScheduler::default();
        scheduler
            .start(&store, tempo(120.0), TimeSignature::four_four(), &mut clock, &mut sink)
            .unwrap();
        scheduler.reset_meter(&store, TimeSignature::six_eight());
        assert_eq!(scheduler.session().unwrap().grid(), TimeSignature::six_eight().grid());
    }
}
