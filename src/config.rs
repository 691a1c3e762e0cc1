// Application configuration - RON file with per-field defaults
//
// Lookup order: `--config <path>`, then `<config dir>/rhythm_practice/config.ron`,
// then built-in defaults. Command-line flags override file values.

use crate::sampler::kit::DrumKit;
use crate::sequencer::scheduler::SchedulerConfig;
use crate::sequencer::store::DEFAULT_MAX_MEASURES;
use crate::sequencer::timeline::{Tempo, TimeSignature};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings of the practice tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub tempo_bpm: f64,
    /// Meter of new sections and of metronome-only playback
    pub time_signature: TimeSignature,
    pub max_measures: u32,
    /// Output gain, 0.0 to 1.0
    pub volume: f32,
    pub kit: DrumKit,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            tempo_bpm: 120.0,
            time_signature: TimeSignature::four_four(),
            max_measures: DEFAULT_MAX_MEASURES,
            volume: 0.8,
            kit: DrumKit::default(),
        }
    }
}

impl AppConfig {
    /// `<config dir>/rhythm_practice/config.ron`, when the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rhythm_practice").join("config.ron"))
    }

    /// Parse and validate RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    /// Load a config file; a relative kit directory is resolved next to it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_ron(&text)?;
        if let Some(base) = path.parent() {
            config.kit = config.kit.relative_to(base);
        }
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` (which must exist) or the default file if present
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the config as pretty RON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_ron()?).map_err(io_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.tempo()?;
        if self.max_measures == 0 {
            return Err(ConfigError::Invalid(
                "max_measures must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} outside 0.0..=1.0",
                self.volume
            )));
        }
        Ok(())
    }

    /// Configured tempo
    pub fn tempo(&self) -> Result<Tempo, ConfigError> {
        Tempo::new(self.tempo_bpm).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
