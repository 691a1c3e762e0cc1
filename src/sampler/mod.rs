// Sampler module - Drum kit samples for the audio output

pub mod error;
pub mod kit;
pub mod loader;

pub use error::SampleError;
pub use kit::{DrumKit, LoadedKit};
pub use loader::{Sample, load_sample, resample_linear};
