// Event sink - Destination of scheduled clicks and drum hits
// The scheduler only knows this trait; device output, logging and test
// recording are interchangeable behind it

use super::error::AudioError;
use crate::sequencer::pattern::Instrument;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Receiver of timestamped trigger events
///
/// `time` is expressed on the playback clock and is usually slightly in the
/// future (up to the lookahead window).
pub trait EventSink {
    /// Make the output ready; called by every `start()`
    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    /// Metronome click, accented on the first beat of a bar
    fn play_click(&mut self, accent: bool, time: f64);

    /// One drum hit; instruments without a loaded sample stay silent
    fn play_sample(&mut self, instrument: Instrument, time: f64);

    /// Drop every trigger handed over but not yet heard; called on stop and restart
    fn flush(&mut self) {}

    /// Output gain, 0.0 to 1.0
    fn set_volume(&mut self, _volume: f32) {}
}

/// One emitted trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerEvent {
    Click { accent: bool, time: f64 },
    Sample { instrument: Instrument, time: f64 },
}

impl TriggerEvent {
    pub fn time(&self) -> f64 {
        match self {
            TriggerEvent::Click { time, .. } | TriggerEvent::Sample { time, .. } => *time,
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Click { accent: true, time } => write!(f, "{:>9.4}s  click (accent)", time),
            TriggerEvent::Click { accent: false, time } => write!(f, "{:>9.4}s  click", time),
            TriggerEvent::Sample { instrument, time } => write!(f, "{:>9.4}s  {}", time, instrument),
        }
    }
}

/// Sink that stores every event, for tests and offline simulation
#[derive(Debug, Clone)]
pub struct RecordingSink {
    events: Vec<TriggerEvent>,
    available: bool,
    resumes: usize,
    flushes: usize,
    volume: f32,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            available: true,
            resumes: 0,
            flushes: 0,
            volume: 1.0,
        }
    }

    /// Sink whose `resume()` fails until made available
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Every event in emission order
    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    /// Drain the recorded events
    pub fn take_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.events)
    }

    /// `(accent, time)` of every click
    pub fn clicks(&self) -> Vec<(bool, f64)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                TriggerEvent::Click { accent, time } => Some((accent, time)),
                _ => None,
            })
            .collect()
    }

    /// `(instrument, time)` of every drum hit
    pub fn samples(&self) -> Vec<(Instrument, f64)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                TriggerEvent::Sample { instrument, time } => Some((instrument, time)),
                _ => None,
            })
            .collect()
    }

    /// Number of successful `resume()` calls
    pub fn resume_count(&self) -> usize {
        self.resumes
    }

    /// Number of `flush()` calls
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Last volume set
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn resume(&mut self) -> Result<(), AudioError> {
        if !self.available {
            return Err(AudioError::NoOutputDevice);
        }
        self.resumes += 1;
        Ok(())
    }

    fn play_click(&mut self, accent: bool, time: f64) {
        self.events.push(TriggerEvent::Click { accent, time });
    }

    fn play_sample(&mut self, instrument: Instrument, time: f64) {
        self.events.push(TriggerEvent::Sample { instrument, time });
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

/// Line format of the console sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EventFormat {
    /// Human readable, one event per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Sink printing events as they are scheduled (headless playback)
pub struct ConsoleSink<W: Write> {
    out: W,
    format: EventFormat,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, format: EventFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: TriggerEvent) {
        let written = match self.format {
            EventFormat::Text => writeln!(self.out, "{}", event),
            EventFormat::Json => match serde_json::to_string(&event) {
                Ok(line) => writeln!(self.out, "{}", line),
                Err(e) => {
                    tracing::debug!("cannot encode event: {}", e);
                    return;
                }
            },
        };
        if let Err(e) = written {
            tracing::debug!("cannot write event: {}", e);
        }
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn play_click(&mut self, accent: bool, time: f64) {
        self.emit(TriggerEvent::Click { accent, time });
    }

    fn play_sample(&mut self, instrument: Instrument, time: f64) {
        self.emit(TriggerEvent::Sample { instrument, time });
    }
}
