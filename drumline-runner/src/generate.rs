//! Drum generation
//!
//! Turns a source recording plus (genre, tempo, level) into a drum track.
//! The shipped generator is template-driven: each genre carries a one-bar
//! pattern in eighth-note slots which is tiled across the duration of the
//! recording, with the difficulty level controlling hi-hat density and
//! accents.

use drumline_core::{DrumTrack, DrumVoice, NoteEvent};
use std::path::Path;
use tracing::{debug, info};

use crate::error::PipelineError;

pub trait DrumGenerator: Send + Sync {
    /// Produces a drum track whose events all fall within the duration of
    /// the audio at `audio`
    fn generate(
        &self,
        audio: &Path,
        genre: &str,
        tempo: u32,
        level: &str,
    ) -> Result<DrumTrack, PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Genre {
    Rock,
    Pop,
    Funk,
    Jazz,
}

impl Genre {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rock" => Some(Genre::Rock),
            "pop" => Some(Genre::Pop),
            "funk" => Some(Genre::Funk),
            "jazz" => Some(Genre::Jazz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Easy,
    Normal,
    Hard,
}

impl Level {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Level::Easy),
            "normal" => Some(Level::Normal),
            "hard" => Some(Level::Hard),
            _ => None,
        }
    }
}

/// One 4/4 bar in eighth-note slots (0..8)
struct BarTemplate {
    kicks: &'static [usize],
    snares: &'static [usize],
}

impl Genre {
    fn template(self) -> BarTemplate {
        match self {
            // Backbeat on 2 and 4
            Genre::Rock => BarTemplate {
                kicks: &[0, 4],
                snares: &[2, 6],
            },
            // Extra kick pickup into beat 3
            Genre::Pop => BarTemplate {
                kicks: &[0, 3, 4],
                snares: &[2, 6],
            },
            // Syncopated kicks
            Genre::Funk => BarTemplate {
                kicks: &[0, 3, 5],
                snares: &[2, 6],
            },
            // Sparse kick, comping snare off the beat
            Genre::Jazz => BarTemplate {
                kicks: &[0],
                snares: &[3, 7],
            },
        }
    }
}

impl Level {
    /// Hi-hat slots for this difficulty
    fn hihat_slots(self) -> &'static [usize] {
        match self {
            Level::Easy => &[0, 2, 4, 6],
            Level::Normal => &[0, 1, 2, 3, 4, 5, 6, 7],
            Level::Hard => &[0, 1, 2, 3, 4, 5, 6],
        }
    }

    /// Hard parts open the hat on the last eighth of each bar
    fn open_hat_slot(self) -> Option<usize> {
        match self {
            Level::Hard => Some(7),
            _ => None,
        }
    }

    /// Crash every N bars, if any
    fn crash_every(self) -> Option<usize> {
        match self {
            Level::Easy => None,
            Level::Normal => Some(8),
            Level::Hard => Some(4),
        }
    }
}

/// Template-driven drum generator
#[derive(Debug, Default)]
pub struct PatternGenerator;

impl PatternGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl DrumGenerator for PatternGenerator {
    fn generate(
        &self,
        audio: &Path,
        genre: &str,
        tempo: u32,
        level: &str,
    ) -> Result<DrumTrack, PipelineError> {
        let genre = Genre::parse(genre).ok_or_else(|| {
            PipelineError::GenerationFailed(format!("unsupported genre '{genre}'"))
        })?;
        let level = Level::parse(level).ok_or_else(|| {
            PipelineError::GenerationFailed(format!("unsupported level '{level}'"))
        })?;
        if tempo == 0 {
            return Err(PipelineError::GenerationFailed(
                "tempo must be positive".to_string(),
            ));
        }

        let duration_ms = probe_duration_ms(audio)?;
        debug!(
            audio = %audio.display(),
            duration_ms, ?genre, tempo, ?level, "generating drum pattern"
        );

        let ms_per_beat = 60_000.0 / tempo as f64;
        let slot_ms = ms_per_beat / 2.0;
        let bar_ms = ms_per_beat * 4.0;
        let bars = (duration_ms / bar_ms).ceil() as usize;

        let template = genre.template();
        let mut track = DrumTrack::new(tempo);

        for bar in 0..bars {
            let bar_start = bar as f64 * bar_ms;

            let mut put = |slot: usize, voice: DrumVoice, velocity: u8, length_ms: f64| {
                let onset_ms = bar_start + slot as f64 * slot_ms;
                if onset_ms < duration_ms {
                    track.push(NoteEvent {
                        onset_ms,
                        duration_ms: length_ms.min(duration_ms - onset_ms),
                        voice,
                        velocity,
                    });
                }
            };

            for &slot in template.kicks {
                put(slot, DrumVoice::Kick, 100, slot_ms);
            }
            for &slot in template.snares {
                put(slot, DrumVoice::Snare, 95, slot_ms);
            }
            for &slot in level.hihat_slots() {
                // Accent hats that land on a beat
                let velocity = if slot % 2 == 0 { 72 } else { 56 };
                put(slot, DrumVoice::HiHatClosed, velocity, slot_ms / 2.0);
            }
            if let Some(slot) = level.open_hat_slot() {
                put(slot, DrumVoice::HiHatOpen, 80, slot_ms);
            }
            if let Some(every) = level.crash_every()
                && bar % every == 0
            {
                put(0, DrumVoice::Crash, 110, ms_per_beat);
            }
        }

        if track.is_empty() {
            return Err(PipelineError::GenerationFailed(format!(
                "no pattern produced for a {:.0}ms recording at {} bpm",
                duration_ms, tempo
            )));
        }

        info!(
            events = track.len(),
            bars, "drum track generated"
        );
        Ok(track)
    }
}

/// Reads the duration of a PCM WAV recording
fn probe_duration_ms(audio: &Path) -> Result<f64, PipelineError> {
    let reader = hound::WavReader::open(audio).map_err(|e| {
        PipelineError::GenerationFailed(format!(
            "cannot analyze source audio {}: {e}",
            audio.display()
        ))
    })?;

    let spec = reader.spec();
    let frames = reader.duration() as f64;
    let duration_ms = frames / spec.sample_rate as f64 * 1000.0;

    if duration_ms <= 0.0 {
        return Err(PipelineError::GenerationFailed(format!(
            "source audio {} is empty",
            audio.display()
        )));
    }

    Ok(duration_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Writes `secs` seconds of silence as a mono 16-bit WAV
    fn write_test_wav(dir: &Path, name: &str, secs: f64) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..(8_000.0 * secs) as usize {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_events_bounded_by_duration() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_test_wav(dir.path(), "song.wav", 3.0);

        let track = PatternGenerator::new()
            .generate(&audio, "Rock", 120, "Normal")
            .unwrap();

        assert!(!track.is_empty());
        assert_eq!(track.tempo, 120);
        for event in &track.events {
            assert!(event.onset_ms >= 0.0);
            assert!(event.onset_ms < 3_000.0, "onset {} out of range", event.onset_ms);
            assert!(event.onset_ms + event.duration_ms <= 3_000.0 + 1e-6);
        }
    }

    #[test]
    fn test_genre_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_test_wav(dir.path(), "song.wav", 2.0);

        let generator = PatternGenerator::new();
        assert!(generator.generate(&audio, "rock", 100, "easy").is_ok());
        assert!(generator.generate(&audio, "JAZZ", 100, "Hard").is_ok());
    }

    #[test]
    fn test_unsupported_genre_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_test_wav(dir.path(), "song.wav", 2.0);

        let err = PatternGenerator::new()
            .generate(&audio, "Polka", 120, "Normal")
            .unwrap_err();
        assert!(matches!(err, PipelineError::GenerationFailed(_)));
        assert!(err.to_string().contains("Polka"));
    }

    #[test]
    fn test_zero_tempo_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_test_wav(dir.path(), "song.wav", 2.0);

        let err = PatternGenerator::new()
            .generate(&audio, "Rock", 0, "Normal")
            .unwrap_err();
        assert!(matches!(err, PipelineError::GenerationFailed(_)));
    }

    #[test]
    fn test_unreadable_audio_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not_audio.wav");
        std::fs::write(&bogus, b"this is not a wav file").unwrap();

        let err = PatternGenerator::new()
            .generate(&bogus, "Rock", 120, "Normal")
            .unwrap_err();
        assert!(matches!(err, PipelineError::GenerationFailed(_)));
    }

    #[test]
    fn test_level_controls_density() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_test_wav(dir.path(), "song.wav", 4.0);
        let generator = PatternGenerator::new();

        let easy = generator.generate(&audio, "Pop", 120, "Easy").unwrap();
        let hard = generator.generate(&audio, "Pop", 120, "Hard").unwrap();
        assert!(hard.len() > easy.len());

        let has_open_hat = |t: &DrumTrack| t.events.iter().any(|e| e.voice == DrumVoice::HiHatOpen);
        assert!(!has_open_hat(&easy));
        assert!(has_open_hat(&hard));
    }
}
