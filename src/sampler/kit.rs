// Drum kit - Sample file layout and the preloaded sample set

use super::error::SampleError;
use super::loader::load_sample;
use crate::sequencer::pattern::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the kit's WAV files live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumKit {
    /// Directory holding the sample files
    pub directory: PathBuf,
    /// Per-instrument file name overrides, relative to `directory`
    pub files: BTreeMap<Instrument, PathBuf>,
}

impl DrumKit {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            files: BTreeMap::new(),
        }
    }

    /// Full path of an instrument's sample
    pub fn path_for(&self, instrument: Instrument) -> PathBuf {
        match self.files.get(&instrument) {
            Some(file) => self.directory.join(file),
            None => self.directory.join(instrument.default_sample_file()),
        }
    }

    /// Resolve a relative kit directory against `base` (the config file's folder)
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.directory.is_relative() {
            self.directory = base.join(&self.directory);
        }
        self
    }

    /// Load every sample at `sample_rate`
    ///
    /// Missing or unreadable files are logged and left out; they never fail
    /// the whole kit.
    pub fn load(&self, sample_rate: u32) -> LoadedKit {
        let mut kit = LoadedKit::empty();
        for instrument in Instrument::ALL {
            match self.load_one(instrument, sample_rate) {
                Ok(data) => {
                    debug!("loaded {} ({} frames)", instrument, data.len());
                    kit.samples.insert(instrument, data);
                }
                Err(e) => {
                    warn!("{}", e);
                    kit.missing.push(instrument);
                }
            }
        }
        kit
    }

    fn load_one(&self, instrument: Instrument, sample_rate: u32) -> Result<Arc<[f32]>, SampleError> {
        let path = self.path_for(instrument);
        if !path.is_file() {
            return Err(SampleError::MissingAsset { instrument, path });
        }
        let sample = load_sample(&path)?.resampled(sample_rate);
        Ok(Arc::from(sample.data))
    }
}

impl Default for DrumKit {
    fn default() -> Self {
        Self::new("audio")
    }
}

/// Decoded kit samples at the output rate, shared with the audio thread
#[derive(Debug, Clone, Default)]
pub struct LoadedKit {
    samples: BTreeMap<Instrument, Arc<[f32]>>,
    missing: Vec<Instrument>,
}

impl LoadedKit {
    /// Kit with no samples (every drum hit is silent)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, instrument: Instrument) -> Option<&Arc<[f32]>> {
        self.samples.get(&instrument)
    }

    pub fn is_loaded(&self, instrument: Instrument) -> bool {
        self.samples.contains_key(&instrument)
    }

    /// Instruments whose sample could not be loaded
    pub fn missing(&self) -> &[Instrument] {
        &self.missing
    }

    pub fn loaded_count(&self) -> usize {
        self.samples.len()
    }
}
