// Metronome - Click sounds for beat boundaries
// Pre-generates short square-wave clicks so the output callback only copies

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

impl ClickType {
    pub fn from_accent(accent: bool) -> Self {
        if accent {
            ClickType::Accent
        } else {
            ClickType::Regular
        }
    }

    /// Oscillator frequency in Hz
    pub fn frequency(&self) -> f32 {
        match self {
            ClickType::Accent => 1400.0,
            ClickType::Regular => 900.0,
        }
    }

    /// Peak amplitude of the envelope
    pub fn peak(&self) -> f32 {
        match self {
            ClickType::Accent => 0.18,
            ClickType::Regular => 0.12,
        }
    }
}

/// Metronome click sound generator
#[derive(Debug, Clone)]
pub struct MetronomeSound {
    accent_samples: Vec<f32>,
    regular_samples: Vec<f32>,
}

impl MetronomeSound {
    const ATTACK_SECONDS: f32 = 0.002;
    const DECAY_SECONDS: f32 = 0.025;
    /// Silence gap before the oscillator stops
    const TAIL_SECONDS: f32 = 0.01;

    /// Create new metronome sound generator
    pub fn new(sample_rate: f32) -> Self {
        Self {
            accent_samples: Self::generate_click(sample_rate, ClickType::Accent),
            regular_samples: Self::generate_click(sample_rate, ClickType::Regular),
        }
    }

    /// Square wave with a linear attack/decay envelope
    fn generate_click(sample_rate: f32, click_type: ClickType) -> Vec<f32> {
        let attack = (Self::ATTACK_SECONDS * sample_rate).max(1.0);
        let decay = (Self::DECAY_SECONDS * sample_rate).max(1.0);
        let num_samples =
            ((Self::ATTACK_SECONDS + Self::DECAY_SECONDS + Self::TAIL_SECONDS) * sample_rate)
                .round() as usize;
        let period = sample_rate / click_type.frequency();
        let peak = click_type.peak();

        (0..num_samples)
            .map(|i| {
                let n = i as f32;
                let envelope = if n < attack {
                    peak * n / attack
                } else if n < attack + decay {
                    peak * (1.0 - (n - attack) / decay)
                } else {
                    0.0
                };
                let square = if (n % period) < period * 0.5 { 1.0 } else { -1.0 };
                square * envelope
            })
            .collect()
    }

    /// Get click samples for given type
    pub fn get_click(&self, click_type: ClickType) -> &[f32] {
        match click_type {
            ClickType::Accent => &self.accent_samples,
            ClickType::Regular => &self.regular_samples,
        }
    }

    /// Get duration of click in samples
    pub fn click_duration(&self) -> usize {
        self.accent_samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metronome_sound_generation() {
        let sound = MetronomeSound::new(48000.0);

        let accent = sound.get_click(ClickType::Accent);
        let regular = sound.get_click(ClickType::Regular);

        assert!(!accent.is_empty());
        assert_eq!(accent.len(), regular.len());

        // 2ms + 25ms + 10ms at 48kHz
        assert_eq!(sound.click_duration(), 1776);

        // Accent should be louder (higher peak amplitude)
        let accent_peak = accent.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let regular_peak = regular.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(accent_peak > regular_peak);
        assert!(accent_peak <= 0.18 + f32::EPSILON);
    }

    #[test]
    fn test_click_ends_silent() {
        let sound = MetronomeSound::new(44100.0);
        let click = sound.get_click(ClickType::Regular);
        let tail = &click[click.len() - 100..];
        assert!(tail.iter().all(|s| *s == 0.0));
        assert_eq!(click[0], 0.0);
    }

    #[test]
    fn test_click_type_from_accent() {
        assert_eq!(ClickType::from_accent(true), ClickType::Accent);
        assert_eq!(ClickType::from_accent(false), ClickType::Regular);
    }
}
