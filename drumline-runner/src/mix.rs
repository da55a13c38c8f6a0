//! Audio mixing
//!
//! Combines the original recording with the rendered guide-drum audio into
//! one track. The built-in mixer handles WAV input, reconciling channel
//! count and sample rate before summing.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::PipelineError;

pub trait AudioMixer: Send + Sync {
    /// Produces the mixed-audio file and returns its path
    fn mix(&self, original: &Path, guide: &Path, out_dir: &Path)
    -> Result<PathBuf, PipelineError>;
}

/// WAV-in, WAV-out mixer
pub struct WavMixer {
    /// Gain applied to the original recording
    pub source_gain: f32,
    /// Gain applied to the guide drums
    pub drum_gain: f32,
}

impl Default for WavMixer {
    fn default() -> Self {
        Self {
            source_gain: 1.0,
            drum_gain: 0.8,
        }
    }
}

impl AudioMixer for WavMixer {
    fn mix(
        &self,
        original: &Path,
        guide: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let (source, source_rate) = read_stereo(original)
            .map_err(|e| PipelineError::MixFailed(format!("{}: {e}", original.display())))?;
        let (drums, drums_rate) = read_stereo(guide)
            .map_err(|e| PipelineError::MixFailed(format!("{}: {e}", guide.display())))?;

        let drums = if drums_rate != source_rate {
            debug!(from = drums_rate, to = source_rate, "resampling guide audio");
            resample(&drums, drums_rate, source_rate)
        } else {
            drums
        };

        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let mix_path = out_dir.join(format!("{stem}(mix).wav"));

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: source_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&mix_path, spec)
            .map_err(|e| PipelineError::MixFailed(format!("{}: {e}", mix_path.display())))?;

        // The mix keeps the original's duration; guide audio past the end
        // of the source (or silence past the end of the guide) is dropped
        for (i, frame) in source.iter().enumerate() {
            let drum_frame = drums.get(i).copied().unwrap_or([0.0, 0.0]);
            for ch in 0..2 {
                let sample =
                    (frame[ch] * self.source_gain + drum_frame[ch] * self.drum_gain).clamp(-1.0, 1.0);
                writer
                    .write_sample((sample * i16::MAX as f32) as i16)
                    .map_err(|e| PipelineError::MixFailed(e.to_string()))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| PipelineError::MixFailed(format!("{}: {e}", mix_path.display())))?;

        info!(mix = %mix_path.display(), frames = source.len(), "mix rendered");
        Ok(mix_path)
    }
}

/// Reads a WAV file into interleaved stereo frames at its native rate
fn read_stereo(path: &Path) -> Result<(Vec<[f32; 2]>, u32), String> {
    let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?
        }
    };

    let frames = match spec.channels {
        1 => samples.iter().map(|&s| [s, s]).collect(),
        2 => samples.chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
        n => return Err(format!("unsupported channel count {n}")),
    };

    Ok((frames, spec.sample_rate))
}

/// Linear-interpolation resampler; adequate for a guide track
fn resample(frames: &[[f32; 2]], from: u32, to: u32) -> Vec<[f32; 2]> {
    if frames.is_empty() || from == to {
        return frames.to_vec();
    }

    let ratio = from as f64 / to as f64;
    let out_len = (frames.len() as f64 / ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let i0 = (pos.floor() as usize).min(frames.len() - 1);
            let i1 = (i0 + 1).min(frames.len() - 1);
            let frac = (pos - i0 as f64) as f32;
            [
                frames[i0][0] * (1.0 - frac) + frames[i1][0] * frac,
                frames[i0][1] * (1.0 - frac) + frames[i1][1] * frac,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, rate: u32, channels: u16, secs: f64, amplitude: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (rate as f64 * secs) as usize;
        for _ in 0..frames {
            for _ in 0..channels {
                writer
                    .write_sample((amplitude * i16::MAX as f32) as i16)
                    .unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mix_keeps_original_duration() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("input.wav");
        let guide = dir.path().join("input(guide).wav");
        write_wav(&original, 8_000, 2, 2.0, 0.2);
        write_wav(&guide, 8_000, 2, 3.5, 0.2); // longer than the original

        let mix_path = WavMixer::default().mix(&original, &guide, dir.path()).unwrap();
        assert_eq!(mix_path, dir.path().join("input(mix).wav"));

        let reader = hound::WavReader::open(&mix_path).unwrap();
        let duration_s = reader.duration() as f64 / reader.spec().sample_rate as f64;
        assert!((duration_s - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_mix_reconciles_channels_and_rates() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("song.wav");
        let guide = dir.path().join("song(guide).wav");
        write_wav(&original, 8_000, 1, 1.0, 0.3); // mono
        write_wav(&guide, 16_000, 2, 1.0, 0.3); // stereo at twice the rate

        let mix_path = WavMixer::default().mix(&original, &guide, dir.path()).unwrap();

        let reader = hound::WavReader::open(&mix_path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8_000);
        let duration_s = reader.duration() as f64 / spec.sample_rate as f64;
        assert!((duration_s - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_mix_clamps_summed_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("loud.wav");
        let guide = dir.path().join("loud(guide).wav");
        write_wav(&original, 8_000, 1, 0.5, 0.9);
        write_wav(&guide, 8_000, 1, 0.5, 0.9);

        let mix_path = WavMixer::default().mix(&original, &guide, dir.path()).unwrap();

        let mut reader = hound::WavReader::open(&mix_path).unwrap();
        assert!(reader.samples::<i16>().all(|s| s.is_ok()));
    }

    #[test]
    fn test_unreadable_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.wav");
        std::fs::write(&bogus, b"nope").unwrap();
        let guide = dir.path().join("g.wav");
        write_wav(&guide, 8_000, 1, 0.5, 0.2);

        let err = WavMixer::default()
            .mix(&bogus, &guide, dir.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MixFailed(_)));
    }

    #[test]
    fn test_resample_halves_frames() {
        let frames = vec![[0.0, 0.0]; 1_000];
        let out = resample(&frames, 16_000, 8_000);
        assert_eq!(out.len(), 500);
    }
}
