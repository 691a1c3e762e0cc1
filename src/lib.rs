// Rhythm practice - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod clock;
pub mod config;
pub mod messaging;
pub mod runner;
pub mod sampler;
pub mod sequencer;
pub mod simulate;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioTiming, CpalSink, EventSink, RecordingSink, TriggerEvent};
pub use clock::{AudioClock, Clock, ManualClock, SystemClock, TimerHandle};
pub use config::{AppConfig, ConfigError};
pub use messaging::{Command, create_command_channel};
pub use runner::PlaybackHost;
pub use sequencer::{
    Direction, Instrument, PatternStore, PlaybackScheduler, SchedulerConfig, SchedulerState,
    SequencerError, Tempo, TimeSignature, Transport,
};
pub use simulate::{SimulationOptions, run_simulation};
