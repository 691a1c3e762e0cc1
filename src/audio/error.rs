// Audio errors - output device and stream failures

use thiserror::Error;

/// Failures while opening or running the output stream
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("cannot read default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("cannot build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("cannot start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0} (supported: F32, I16, U16)")]
    UnsupportedSampleFormat(String),
}
