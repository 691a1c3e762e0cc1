// Voice mixer - Sample-accurate one-shot playback inside the output callback
//
// Runs on the audio thread: no allocation after construction, no locks.
// Voices are started on the exact sample their trigger time maps to.

use crate::sampler::kit::LoadedKit;
use crate::sequencer::metronome::{ClickType, MetronomeSound};
use crate::sequencer::pattern::Instrument;

/// Polyphony limit; the oldest voice is dropped when exceeded
pub const MAX_VOICES: usize = 32;

/// What a scheduled voice plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSource {
    Click(ClickType),
    Drum(Instrument),
}

/// One trigger, positioned on the output's sample clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledVoice {
    pub start_sample: u64,
    pub source: VoiceSource,
}

#[derive(Debug, Clone, Copy)]
struct ActiveVoice {
    source: VoiceSource,
    start_sample: u64,
}

/// Mono mixer of clicks and drum samples
pub struct VoiceMixer {
    clicks: MetronomeSound,
    kit: LoadedKit,
    voices: Vec<ActiveVoice>,
}

impl VoiceMixer {
    pub fn new(sample_rate: u32, kit: LoadedKit) -> Self {
        Self {
            clicks: MetronomeSound::new(sample_rate as f32),
            kit,
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }

    /// Queue a voice; a start time already in the past plays immediately
    ///
    /// Drums without a loaded sample are dropped.
    pub fn schedule(&mut self, voice: ScheduledVoice, current_sample: u64) {
        if let VoiceSource::Drum(instrument) = voice.source
            && !self.kit.is_loaded(instrument)
        {
            return;
        }
        if self.voices.len() == MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(ActiveVoice {
            source: voice.source,
            start_sample: voice.start_sample.max(current_sample),
        });
    }

    /// Mixed value of the frame at `position`; finished voices are released
    pub fn next_sample(&mut self, position: u64) -> f32 {
        let mut mix = 0.0;
        let mut i = 0;
        while i < self.voices.len() {
            let voice = self.voices[i];
            if position < voice.start_sample {
                i += 1;
                continue;
            }
            let data = self.data(voice.source);
            let offset = (position - voice.start_sample) as usize;
            if let Some(&value) = data.get(offset) {
                mix += value;
            }
            if offset + 1 >= data.len() {
                self.voices.remove(i);
            } else {
                i += 1;
            }
        }
        mix
    }

    /// Fill a mono block starting at `position`
    pub fn render(&mut self, out: &mut [f32], position: u64) {
        for (i, frame) in out.iter_mut().enumerate() {
            *frame = self.next_sample(position + i as u64);
        }
    }

    /// Voices started or waiting to start
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Release every voice, started or pending
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    fn data(&self, source: VoiceSource) -> &[f32] {
        match source {
            VoiceSource::Click(click_type) => self.clicks.get_click(click_type),
            VoiceSource::Drum(instrument) => self.kit.get(instrument).map(|d| &d[..]).unwrap_or(&[]),
        }
    }
}

/// tanh saturation keeping the sum of overlapping voices inside [-1, 1]
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}
