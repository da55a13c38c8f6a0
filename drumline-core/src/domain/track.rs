//! Drum track types
//!
//! The in-memory intermediate produced by drum generation. A track is owned
//! by exactly one pipeline run; it is serialized to a MIDI artifact and then
//! discarded, never persisted directly.

use serde::{Deserialize, Serialize};

/// Percussion voice, mapped to General MIDI channel-10 notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrumVoice {
    Kick,
    Snare,
    HiHatClosed,
    HiHatOpen,
    Crash,
}

impl DrumVoice {
    /// General MIDI percussion key for this voice
    pub fn gm_note(&self) -> u8 {
        match self {
            DrumVoice::Kick => 36,
            DrumVoice::Snare => 38,
            DrumVoice::HiHatClosed => 42,
            DrumVoice::HiHatOpen => 46,
            DrumVoice::Crash => 49,
        }
    }
}

/// A single timed percussion hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset relative to the start of the recording, in milliseconds
    pub onset_ms: f64,
    pub duration_ms: f64,
    pub voice: DrumVoice,
    pub velocity: u8,
}

/// An ordered sequence of timed note events plus the tempo they were
/// generated against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrumTrack {
    /// Beats per minute
    pub tempo: u32,
    /// Events ordered by onset
    pub events: Vec<NoteEvent>,
}

impl DrumTrack {
    pub fn new(tempo: u32) -> Self {
        Self {
            tempo,
            events: Vec::new(),
        }
    }

    /// Appends an event, keeping the sequence ordered by onset
    pub fn push(&mut self, event: NoteEvent) {
        let idx = self
            .events
            .partition_point(|e| e.onset_ms <= event.onset_ms);
        self.events.insert(idx, event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// End of the last event, in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.onset_ms + e.duration_ms)
            .fold(0.0, f64::max)
    }
}
