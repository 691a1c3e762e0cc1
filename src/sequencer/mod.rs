// Sequencer module
// Song timeline, step patterns and the lookahead playback scheduler

pub mod error;
pub mod metronome;
pub mod pattern;
pub mod scheduler;
pub mod section;
pub mod store;
pub mod timeline;
pub mod transport;

pub use error::{SequencerError, SequencerResult};
pub use metronome::{ClickType, MetronomeSound};
pub use pattern::{DrumPattern, Instrument};
pub use scheduler::{PlaybackScheduler, PlaybackSession, SchedulerConfig, SchedulerState};
pub use section::{Direction, Section, SectionId};
pub use store::{DEFAULT_MAX_MEASURES, PatternStore};
pub use timeline::{BeatUnit, MAX_BPM, MIN_BPM, StepGrid, Tempo, TimeSignature};
pub use transport::Transport;
