// Sample loader - WAV decoding to mono f32 plus rate conversion

use super::error::SampleError;
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// Decoded one-shot sample, mixed down to mono
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub data: Vec<f32>,
    pub sample_rate: u32,
}

impl Sample {
    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Same sample at `target_rate`
    pub fn resampled(self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || target_rate == 0 {
            return self;
        }
        Self {
            data: resample_linear(&self.data, self.sample_rate, target_rate),
            sample_rate: target_rate,
            name: self.name,
        }
    }
}

/// Load a WAV file (integer or float PCM, any channel count)
pub fn load_sample(path: &Path) -> Result<Sample, SampleError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "wav" {
        return Err(SampleError::UnsupportedFormat(extension));
    }

    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let data = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(Sample {
        name: path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
        data,
        sample_rate: spec.sample_rate,
    })
}

/// Linear interpolation resampler
pub fn resample_linear(data: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || data.is_empty() {
        return data.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (data.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let last = data.len() - 1;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx >= last {
                return data[last];
            }
            let frac = (src_pos - idx as f64) as f32;
            data[idx] * (1.0 - frac) + data[idx + 1] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kick.wav");
        write_wav(&path, 1, 44100, &[0, 16384, -16384, 0]);

        let sample = load_sample(&path).unwrap();
        assert_eq!(sample.name, "kick.wav");
        assert_eq!(sample.sample_rate, 44100);
        assert_eq!(sample.data, vec![0.0, 0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snare.wav");
        write_wav(&path, 2, 48000, &[16384, 0, -16384, -16384]);

        let sample = load_sample(&path).unwrap();
        assert_eq!(sample.data, vec![0.25, -0.5]);
    }

    #[test]
    fn test_unsupported_format() {
        let result = load_sample(Path::new("crash.mp3"));
        assert!(matches!(result, Err(SampleError::UnsupportedFormat(ext)) if ext == "mp3"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_sample(&dir.path().join("nope.wav")),
            Err(SampleError::Wav(_))
        ));
    }

    #[test]
    fn test_resample_linear() {
        let up = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(up, vec![0.0, 0.5, 1.0, 1.0]);

        let down = resample_linear(&[0.0, 0.25, 0.5, 0.75], 2, 1);
        assert_eq!(down, vec![0.0, 0.5]);

        assert_eq!(resample_linear(&[0.3], 44100, 44100), vec![0.3]);
        assert!(resample_linear(&[], 44100, 48000).is_empty());
    }

    #[test]
    fn test_resampled_sample_keeps_duration() {
        let sample = Sample {
            name: "hat".to_string(),
            data: vec![0.0; 44100],
            sample_rate: 44100,
        };
        let resampled = sample.resampled(48000);
        assert_eq!(resampled.sample_rate, 48000);
        assert_eq!(resampled.data.len(), 48000);
        assert!((resampled.duration_seconds() - 1.0).abs() < 1e-9);
    }
}
