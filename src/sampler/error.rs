// Sample errors - drum kit loading failures

use crate::sequencer::pattern::Instrument;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading kit samples
///
/// None of these abort playback: the affected instrument simply stays silent.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("missing sample for {instrument}: {}", path.display())]
    MissingAsset { instrument: Instrument, path: PathBuf },

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot decode WAV: {0}")]
    Wav(#[from] hound::Error),
}
