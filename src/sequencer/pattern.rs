// Pattern - Per-instrument boolean step grid for one section

use super::error::SequencerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Drum voices of the practice kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Kick,
    Snare,
    OpenHat,
    ClosedHat,
    Crash,
}

impl Instrument {
    /// Every instrument, in grid row order
    pub const ALL: [Instrument; 5] = [
        Instrument::Kick,
        Instrument::Snare,
        Instrument::OpenHat,
        Instrument::ClosedHat,
        Instrument::Crash,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Kick => "Kick",
            Instrument::Snare => "Snare",
            Instrument::OpenHat => "Open Hat",
            Instrument::ClosedHat => "Closed Hat",
            Instrument::Crash => "Crash",
        }
    }

    /// Default sample file for this instrument inside a kit directory
    pub fn default_sample_file(&self) -> &'static str {
        match self {
            Instrument::Kick => "kick.wav",
            Instrument::Snare => "snare.wav",
            Instrument::OpenHat => "ohat.wav",
            Instrument::ClosedHat => "chat.wav",
            Instrument::Crash => "crash.wav",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = SequencerError;

    /// Case-insensitive; spaces, dashes and underscores are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "kick" | "bd" => Ok(Instrument::Kick),
            "snare" | "sd" => Ok(Instrument::Snare),
            "openhat" | "ohat" | "oh" => Ok(Instrument::OpenHat),
            "closedhat" | "chat" | "hh" | "ch" => Ok(Instrument::ClosedHat),
            "crash" | "cr" => Ok(Instrument::Crash),
            _ => Err(SequencerError::UnknownInstrument(s.to_string())),
        }
    }
}

/// Step pattern: one boolean sequence per instrument, all of equal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrumPattern {
    steps: BTreeMap<Instrument, Vec<bool>>,
    len: usize,
}

impl DrumPattern {
    /// Zero-filled pattern of `len` steps for every instrument
    pub fn new(len: usize) -> Self {
        Self {
            steps: Instrument::ALL
                .iter()
                .map(|&instrument| (instrument, vec![false; len]))
                .collect(),
            len,
        }
    }

    /// Number of steps in every sequence
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Truncate or zero-extend every sequence to `len`
    ///
    /// Values below the new length are kept in place.
    pub fn resize(&mut self, len: usize) {
        for sequence in self.steps.values_mut() {
            sequence.resize(len, false);
        }
        self.len = len;
    }

    /// Step sequence of one instrument
    pub fn sequence(&self, instrument: Instrument) -> Option<&[bool]> {
        self.steps.get(&instrument).map(Vec::as_slice)
    }

    /// Bit at `step`, false when out of range
    pub fn is_on(&self, instrument: Instrument, step: usize) -> bool {
        self.steps
            .get(&instrument)
            .and_then(|sequence| sequence.get(step))
            .copied()
            .unwrap_or(false)
    }

    /// Mutable bit at `step`
    pub(crate) fn step_mut(&mut self, instrument: Instrument, step: usize) -> Option<&mut bool> {
        self.steps
            .get_mut(&instrument)
            .and_then(|sequence| sequence.get_mut(step))
    }

    /// Instruments whose bit at `step` is set, in grid row order
    pub fn hits_at(&self, step: usize) -> impl Iterator<Item = Instrument> + '_ {
        self.steps
            .iter()
            .filter(move |(_, sequence)| sequence.get(step).copied().unwrap_or(false))
            .map(|(&instrument, _)| instrument)
    }

    /// Count of set bits across all instruments
    pub fn hit_count(&self) -> usize {
        self.steps
            .values()
            .map(|sequence| sequence.iter().filter(|&&on| on).count())
            .sum()
    }

    /// Clear every bit, keeping the length
    pub fn clear(&mut self) {
        for sequence in self.steps.values_mut() {
            sequence.fill(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_parse() {
        assert_eq!("kick".parse::<Instrument>(), Ok(Instrument::Kick));
        assert_eq!("Open Hat".parse::<Instrument>(), Ok(Instrument::OpenHat));
        assert_eq!("closed-hat".parse::<Instrument>(), Ok(Instrument::ClosedHat));
        assert_eq!("OHAT".parse::<Instrument>(), Ok(Instrument::OpenHat));
        assert_eq!(
            "cowbell".parse::<Instrument>(),
            Err(SequencerError::UnknownInstrument("cowbell".to_string()))
        );
    }

    #[test]
    fn test_new_pattern_is_zero_filled() {
        let pattern = DrumPattern::new(16);
        assert_eq!(pattern.len(), 16);
        for instrument in Instrument::ALL {
            let sequence = pattern.sequence(instrument).unwrap();
            assert_eq!(sequence.len(), 16);
            assert!(sequence.iter().all(|&on| !on));
        }
        assert_eq!(pattern.hit_count(), 0);
    }

    #[test]
    fn test_resize_truncates_and_zero_extends() {
        let mut pattern = DrumPattern::new(8);
        *pattern.step_mut(Instrument::Kick, 1).unwrap() = true;
        *pattern.step_mut(Instrument::Kick, 7).unwrap() = true;

        pattern.resize(4);
        assert_eq!(pattern.sequence(Instrument::Kick).unwrap(), &[false, true, false, false]);

        pattern.resize(8);
        assert!(pattern.is_on(Instrument::Kick, 1));
        assert!(!pattern.is_on(Instrument::Kick, 7));
        for instrument in Instrument::ALL {
            assert_eq!(pattern.sequence(instrument).unwrap().len(), 8);
        }
    }

    #[test]
    fn test_hits_at() {
        let mut pattern = DrumPattern::new(4);
        *pattern.step_mut(Instrument::Snare, 2).unwrap() = true;
        *pattern.step_mut(Instrument::Kick, 2).unwrap() = true;

        let hits: Vec<_> = pattern.hits_at(2).collect();
        assert_eq!(hits, vec![Instrument::Kick, Instrument::Snare]);
        assert_eq!(pattern.hits_at(0).count(), 0);
        assert_eq!(pattern.hits_at(99).count(), 0);
        assert!(!pattern.is_on(Instrument::Kick, 99));
    }

    #[test]
    fn test_clear() {
        let mut pattern = DrumPattern::new(4);
        *pattern.step_mut(Instrument::Crash, 0).unwrap() = true;
        pattern.clear();
        assert_eq!(pattern.hit_count(), 0);
        assert_eq!(pattern.len(), 4);
    }
}
