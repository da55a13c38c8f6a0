//! MIDI serialization
//!
//! Writes a drum track as a single-track SMF with all notes on MIDI channel
//! 10 (index 9), the General MIDI percussion channel.

use drumline_core::DrumTrack;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PipelineError;

/// Pulses per quarter note; 480 gives sub-millisecond resolution at any
/// realistic tempo
const PPQ: u16 = 480;

/// MIDI artifact path: the source file's base name with a `.mid` suffix
pub fn midi_path_for(audio: &Path, out_dir: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    out_dir.join(format!("{stem}.mid"))
}

/// Serializes the track to `path`
pub fn write_midi(track: &DrumTrack, path: &Path) -> Result<(), PipelineError> {
    if track.tempo == 0 {
        return Err(PipelineError::WriteFailed(
            "track tempo must be greater than 0".to_string(),
        ));
    }

    let header = Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(PPQ.into()),
    };

    let ticks_per_ms = ticks_per_ms(track.tempo);

    let mut events: Vec<(u32, TrackEventKind)> = Vec::with_capacity(track.events.len() * 2 + 2);

    // Tempo meta event at tick 0
    let us_per_quarter = 60_000_000 / track.tempo;
    events.push((
        0,
        TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
    ));

    for note in &track.events {
        let tick_on = (note.onset_ms * ticks_per_ms) as u32;
        let tick_off = ((note.onset_ms + note.duration_ms) * ticks_per_ms) as u32;

        events.push((
            tick_on,
            TrackEventKind::Midi {
                channel: 9.into(),
                message: MidiMessage::NoteOn {
                    key: note.voice.gm_note().into(),
                    vel: note.velocity.into(),
                },
            },
        ));
        events.push((
            tick_off.max(tick_on + 1),
            TrackEventKind::Midi {
                channel: 9.into(),
                message: MidiMessage::NoteOff {
                    key: note.voice.gm_note().into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    events.sort_by_key(|(tick, _)| *tick);

    // Convert absolute ticks to deltas
    let mut midi_track = Track::new();
    let mut last_tick = 0u32;
    for (tick, kind) in events {
        let delta = tick.saturating_sub(last_tick);
        midi_track.push(TrackEvent {
            delta: delta.into(),
            kind,
        });
        last_tick = tick;
    }
    midi_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header,
        tracks: vec![midi_track],
    };

    smf.save(path).map_err(|e| {
        PipelineError::WriteFailed(format!("cannot write MIDI to {}: {e}", path.display()))
    })?;

    debug!(path = %path.display(), events = track.len(), "wrote MIDI file");
    Ok(())
}

fn ticks_per_ms(tempo: u32) -> f64 {
    let ms_per_quarter = 60_000.0 / tempo as f64;
    PPQ as f64 / ms_per_quarter
}

#[cfg(test)]
mod tests {
    use super::*;
    use drumline_core::{DrumVoice, NoteEvent};

    fn sample_track() -> DrumTrack {
        let mut track = DrumTrack::new(120);
        for (onset, voice) in [
            (0.0, DrumVoice::Kick),
            (500.0, DrumVoice::Snare),
            (1000.0, DrumVoice::Kick),
            (1500.0, DrumVoice::Snare),
        ] {
            track.push(NoteEvent {
                onset_ms: onset,
                duration_ms: 250.0,
                voice,
                velocity: 100,
            });
        }
        track
    }

    #[test]
    fn test_midi_path_uses_source_base_name() {
        let out = PathBuf::from("/tmp/work");
        assert_eq!(
            midi_path_for(&PathBuf::from("/tmp/work/input.wav"), &out),
            PathBuf::from("/tmp/work/input.mid")
        );
        assert_eq!(
            midi_path_for(&PathBuf::from("my song.mp3"), &out),
            PathBuf::from("/tmp/work/my song.mid")
        );
    }

    #[test]
    fn test_write_produces_valid_smf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drums.mid");

        write_midi(&sample_track(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");

        // Round-trip through the parser: same number of note-ons survive
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        let note_ons = smf.tracks[0]
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    TrackEventKind::Midi {
                        message: MidiMessage::NoteOn { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(note_ons, 4);
    }

    #[test]
    fn test_write_rejects_zero_tempo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drums.mid");

        let err = write_midi(&DrumTrack::new(0), &path).unwrap_err();
        assert!(matches!(err, PipelineError::WriteFailed(_)));
        assert!(err.to_string().contains("tempo"));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_to_unwritable_path_fails() {
        let track = sample_track();
        let err = write_midi(&track, &PathBuf::from("/nonexistent-dir/drums.mid")).unwrap_err();
        assert!(matches!(err, PipelineError::WriteFailed(_)));
    }

    #[test]
    fn test_ticks_per_ms() {
        // 120 bpm: 500ms per quarter, 480 ticks per quarter
        assert!((ticks_per_ms(120) - 0.96).abs() < 1e-9);
    }
}
