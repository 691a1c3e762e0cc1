// Timeline - Meter, tempo and step-grid arithmetic
// Converts a time signature into the step grid the scheduler walks

use super::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest accepted beats-per-bar value
pub const MAX_BEATS_PER_BAR: u8 = 16;

/// Note value that carries the pulse of a meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeatUnit {
    /// x/4 meters: one click per quarter note, four steps (16ths) per beat
    Quarter,
    /// Compound x/8 meters (6/8): one click per eighth, two steps per beat
    CompoundEighth,
}

impl BeatUnit {
    /// Denominator as written in the time signature
    pub fn denominator(&self) -> u8 {
        match self {
            BeatUnit::Quarter => 4,
            BeatUnit::CompoundEighth => 8,
        }
    }

    /// Number of grid steps in one beat
    pub fn steps_per_beat(&self) -> usize {
        match self {
            BeatUnit::Quarter => 4,
            BeatUnit::CompoundEighth => 2,
        }
    }
}

/// Time signature (beats per bar / beat unit)
/// Example: 6/8 = TimeSignature { beats_per_bar: 6, beat_unit: CompoundEighth }
///
/// Serialized as its display string ("3/4", "6/8") so config files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignature {
    beats_per_bar: u8,
    beat_unit: BeatUnit,
}

impl TimeSignature {
    /// Creates a validated time signature
    ///
    /// Quarter meters accept 1..=16 beats; compound meters accept 3, 6, 9 or 12.
    pub fn new(beats_per_bar: u8, beat_unit: BeatUnit) -> SequencerResult<Self> {
        let valid = match beat_unit {
            BeatUnit::Quarter => (1..=MAX_BEATS_PER_BAR).contains(&beats_per_bar),
            BeatUnit::CompoundEighth => {
                beats_per_bar > 0 && beats_per_bar <= 12 && beats_per_bar % 3 == 0
            }
        };
        if !valid {
            return Err(SequencerError::InvalidTimeSignature(format!(
                "{}/{}",
                beats_per_bar,
                beat_unit.denominator()
            )));
        }
        Ok(Self {
            beats_per_bar,
            beat_unit,
        })
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self {
            beats_per_bar: 4,
            beat_unit: BeatUnit::Quarter,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self {
            beats_per_bar: 3,
            beat_unit: BeatUnit::Quarter,
        }
    }

    /// Compound 6/8 time signature
    pub fn six_eight() -> Self {
        Self {
            beats_per_bar: 6,
            beat_unit: BeatUnit::CompoundEighth,
        }
    }

    pub fn beats_per_bar(&self) -> u8 {
        self.beats_per_bar
    }

    pub fn beat_unit(&self) -> BeatUnit {
        self.beat_unit
    }

    /// Step grid derived from this meter
    pub fn grid(&self) -> StepGrid {
        let steps_per_beat = self.beat_unit.steps_per_beat();
        StepGrid {
            steps_per_beat,
            steps_per_measure: self.beats_per_bar as usize * steps_per_beat,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.beat_unit.denominator())
    }
}

impl FromStr for TimeSignature {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SequencerError::InvalidTimeSignature(s.to_string());
        let (beats, unit) = s.trim().split_once('/').ok_or_else(invalid)?;
        let beats: u8 = beats.trim().parse().map_err(|_| invalid())?;
        let beat_unit = match unit.trim() {
            "4" => BeatUnit::Quarter,
            "8" => BeatUnit::CompoundEighth,
            _ => return Err(invalid()),
        };
        Self::new(beats, beat_unit)
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = SequencerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSignature> for String {
    fn from(ts: TimeSignature) -> Self {
        ts.to_string()
    }
}

/// Step grid of a meter: how many scheduler steps make a beat and a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGrid {
    pub steps_per_beat: usize,
    pub steps_per_measure: usize,
}

impl StepGrid {
    /// Total steps for a section of `measure_count` bars
    pub fn total_steps(&self, measure_count: u32) -> usize {
        measure_count as usize * self.steps_per_measure
    }

    /// Whether a tick within the measure falls on a beat boundary
    pub fn is_beat(&self, tick_within_measure: usize) -> bool {
        tick_within_measure % self.steps_per_beat == 0
    }
}

/// Slowest accepted tempo
pub const MIN_BPM: f64 = 20.0;
/// Fastest accepted tempo
pub const MAX_BPM: f64 = 999.0;

/// Tempo in BPM (Beats Per Minute)
///
/// The beat is the meter's pulse: a quarter note in x/4, an eighth in 6/8.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> SequencerResult<Self> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(SequencerError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one grid step in seconds
    pub fn step_duration_seconds(&self, grid: &StepGrid) -> f64 {
        self.beat_duration_seconds() / grid.steps_per_beat as f64
    }

    /// Duration of one bar in seconds
    pub fn bar_duration_seconds(&self, grid: &StepGrid) -> f64 {
        self.step_duration_seconds(grid) * grid.steps_per_measure as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}
