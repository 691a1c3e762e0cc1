// Audio output - CPAL stream playing scheduled clicks and drum hits
//
// # Format Support
//
// The device's preferred sample format is detected on open:
// - **F32**: native, no conversion
// - **I16** / **U16**: converted per frame through cpal's `FromSample<f32>`
//
// Mixing happens in f32 mono and is copied to every output channel.
//
// # Threading
//
// Trigger events cross to the callback through a lock-free ring buffer. The
// callback owns the mixer and advances the shared `AudioTiming`, which the
// scheduler reads back through `AudioClock`.
//
// Every queued voice carries the flush generation it was sent in. `flush()`
// bumps the shared generation; the callback then clears the mixer and drops
// queued voices from older generations.

use super::error::AudioError;
use super::mixer::{ScheduledVoice, VoiceMixer, VoiceSource, soft_clip};
use super::sink::EventSink;
use super::timing::AudioTiming;
use crate::sampler::kit::DrumKit;
use crate::sequencer::metronome::ClickType;
use crate::sequencer::pattern::Instrument;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// Ring buffer capacity for pending voices; must hold one lookahead window
/// of triggers
pub const VOICE_QUEUE_CAPACITY: usize = 256;

/// Voice tagged with the flush generation it was sent in
#[derive(Debug, Clone, Copy)]
struct QueuedVoice {
    generation: u64,
    voice: ScheduledVoice,
}

type VoiceProducer = ringbuf::HeapProd<QueuedVoice>;
type VoiceConsumer = ringbuf::HeapCons<QueuedVoice>;

/// Move voices of the current generation into the mixer
///
/// A generation change since the last call silences the mixer first; voices
/// queued before the change are discarded.
fn accept_voices(
    consumer: &mut VoiceConsumer,
    mixer: &mut VoiceMixer,
    seen: &mut u64,
    current: u64,
    position: u64,
) {
    if *seen != current {
        mixer.clear();
        *seen = current;
    }
    while let Some(queued) = consumer.try_pop() {
        if queued.generation == current {
            mixer.schedule(queued.voice, position);
        }
    }
}

/// Output gain shared with the callback (f32 stored as bits)
#[derive(Debug, Clone)]
pub struct OutputGain {
    bits: Arc<AtomicU32>,
}

impl OutputGain {
    pub fn new(gain: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(gain.to_bits())),
        }
    }

    pub fn set(&self, gain: f32) {
        self.bits.store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

struct OpenStream {
    _stream: Stream,
    producer: VoiceProducer,
    missing: Vec<Instrument>,
}

/// Event sink backed by the default output device
///
/// The device is opened lazily by the first `resume()`; kit samples are
/// decoded at that point, at the device's rate.
pub struct CpalSink {
    kit: DrumKit,
    timing: AudioTiming,
    gain: OutputGain,
    generation: Arc<AtomicU64>,
    output: Option<OpenStream>,
}

impl CpalSink {
    pub fn new(kit: DrumKit, volume: f32) -> Self {
        Self {
            kit,
            timing: AudioTiming::new(),
            gain: OutputGain::new(volume.clamp(0.0, 1.0)),
            generation: Arc::new(AtomicU64::new(0)),
            output: None,
        }
    }

    /// Sample clock of the output; hand a clone to `AudioClock`
    pub fn timing(&self) -> &AudioTiming {
        &self.timing
    }

    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }

    fn open(&mut self) -> Result<OpenStream, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        info!(
            "audio device: {} ({} Hz, {} channels, {:?})",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels,
            sample_format
        );

        self.timing.set_sample_rate(sample_rate);
        let kit = self.kit.load(sample_rate);
        let missing = kit.missing().to_vec();
        let mixer = VoiceMixer::new(sample_rate, kit);
        let (producer, consumer) = HeapRb::<QueuedVoice>::new(VOICE_QUEUE_CAPACITY).split();

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&device, &config, channels, consumer, mixer),
            SampleFormat::I16 => self.build_stream::<i16>(&device, &config, channels, consumer, mixer),
            SampleFormat::U16 => self.build_stream::<u16>(&device, &config, channels, consumer, mixer),
            other => return Err(AudioError::UnsupportedSampleFormat(format!("{:?}", other))),
        }?;
        stream.play()?;

        Ok(OpenStream {
            _stream: stream,
            producer,
            missing,
        })
    }

    fn build_stream<T>(
        &self,
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut consumer: VoiceConsumer,
        mut mixer: VoiceMixer,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let timing = self.timing.clone();
        let gain = self.gain.clone();
        let generation = self.generation.clone();
        let mut seen = generation.load(Ordering::Acquire);
        let channels = channels.max(1);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocation, no locks from here on
                let position = timing.current_sample();
                let current = generation.load(Ordering::Acquire);
                accept_voices(&mut consumer, &mut mixer, &mut seen, current, position);

                let level = gain.get();
                let frames = data.len() / channels;
                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    let sample = soft_clip(mixer.next_sample(position + i as u64) * level);
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
                timing.advance(frames);
            },
            move |err| {
                error!("audio stream error: {}", err);
            },
            None,
        )?;
        Ok(stream)
    }

    fn push(&mut self, voice: ScheduledVoice) {
        let queued = QueuedVoice {
            generation: self.generation.load(Ordering::Acquire),
            voice,
        };
        if let Some(output) = self.output.as_mut()
            && output.producer.try_push(queued).is_err()
        {
            warn!("voice queue full, dropping {:?}", voice.source);
        }
    }
}

impl EventSink for CpalSink {
    fn resume(&mut self) -> Result<(), AudioError> {
        if self.output.is_none() {
            self.output = Some(self.open()?);
        }
        Ok(())
    }

    fn play_click(&mut self, accent: bool, time: f64) {
        let voice = ScheduledVoice {
            start_sample: self.timing.seconds_to_sample(time),
            source: VoiceSource::Click(ClickType::from_accent(accent)),
        };
        self.push(voice);
    }

    fn play_sample(&mut self, instrument: Instrument, time: f64) {
        if let Some(output) = self.output.as_ref()
            && output.missing.contains(&instrument)
        {
            debug!("no sample loaded for {}, skipping hit", instrument);
            return;
        }
        let voice = ScheduledVoice {
            start_sample: self.timing.seconds_to_sample(time),
            source: VoiceSource::Drum(instrument),
        };
        self.push(voice);
    }

    fn flush(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("flushing queued voices (generation {})", generation);
    }

    fn set_volume(&mut self, volume: f32) {
        self.gain.set(volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_gain() {
        let gain = OutputGain::new(0.8);
        assert_eq!(gain.get(), 0.8);
        let shared = gain.clone();
        shared.set(1.5);
        assert_eq!(gain.get(), 1.0);
    }

    #[test]
    fn test_events_before_resume_are_dropped() {
        let mut sink = CpalSink::new(DrumKit::default(), 0.5);
        assert!(!sink.is_open());
        sink.play_click(true, 0.1);
        sink.play_sample(Instrument::Kick, 0.1);
        assert!(!sink.is_open());
        assert_eq!(sink.timing().sample_rate(), 0);
    }

    #[test]
    fn test_set_volume_is_clamped() {
        let mut sink = CpalSink::new(DrumKit::default(), 0.5);
        sink.set_volume(0.3);
        assert_eq!(sink.gain.get(), 0.3);
        sink.set_volume(4.0);
        assert_eq!(sink.gain.get(), 1.0);
    }

    #[test]
    fn test_flush_drops_voices_of_earlier_generations() {
        let mut sink = CpalSink::new(DrumKit::default(), 0.5);
        let (mut producer, mut consumer) = HeapRb::<QueuedVoice>::new(8).split();
        let mut mixer = VoiceMixer::new(48000, crate::sampler::kit::LoadedKit::empty());
        let mut seen = sink.generation.load(Ordering::Acquire);
        let click = |start_sample| ScheduledVoice {
            start_sample,
            source: VoiceSource::Click(ClickType::Regular),
        };

        // Old session: one voice already in the mixer, one still queued
        producer.try_push(QueuedVoice { generation: seen, voice: click(0) }).unwrap();
        accept_voices(&mut consumer, &mut mixer, &mut seen, 0, 0);
        producer.try_push(QueuedVoice { generation: 0, voice: click(2400) }).unwrap();
        assert_eq!(mixer.active_voices(), 1);

        sink.flush();
        let current = sink.generation.load(Ordering::Acquire);
        assert_eq!(current, 1);
        producer.try_push(QueuedVoice { generation: current, voice: click(4800) }).unwrap();
        accept_voices(&mut consumer, &mut mixer, &mut seen, current, 100);

        // Only the voice sent after the flush survives
        assert_eq!(mixer.active_voices(), 1);
        let mut block = vec![0.0; 4700];
        mixer.render(&mut block, 100);
        assert!(block.iter().all(|s| *s == 0.0));
    }
}
