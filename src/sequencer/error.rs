// Sequencer errors - pattern store and transport failures

use super::section::Direction;
use thiserror::Error;

/// Errors raised by the pattern store and the playback transport
///
/// Index errors are caller bugs and are reported immediately.
/// `AudioUnavailable` is environmental: the scheduler stays as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    #[error("section {index} out of range (timeline has {len} sections)")]
    SectionOutOfRange { index: usize, len: usize },

    #[error("step {step} out of range (section has {total} steps)")]
    StepOutOfRange { step: usize, total: usize },

    #[error("cannot move section {index} {direction}")]
    MoveOutOfRange { index: usize, direction: Direction },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("invalid time signature: {0}")]
    InvalidTimeSignature(String),

    #[error("invalid scheduler settings: {0}")]
    InvalidSchedulerConfig(String),

    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),
}

impl SequencerError {
    /// True for the index-style errors (bad section, step, move or instrument)
    pub fn is_invalid_index(&self) -> bool {
        matches!(
            self,
            SequencerError::SectionOutOfRange { .. }
                | SequencerError::StepOutOfRange { .. }
                | SequencerError::MoveOutOfRange { .. }
                | SequencerError::UnknownInstrument(_)
        )
    }
}

pub type SequencerResult<T> = Result<T, SequencerError>;
