//! Conversion-job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a conversion job
///
/// Transitions are forward-only: Pending -> Running -> Done | Error.
/// A job never re-enters Pending or Running after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// One of the four named outputs of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    Midi,
    Score,
    GuideAudio,
    MixAudio,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Midi,
        ArtifactKind::Score,
        ArtifactKind::GuideAudio,
        ArtifactKind::MixAudio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Midi => "midi",
            ArtifactKind::Score => "score",
            ArtifactKind::GuideAudio => "guideAudio",
            ArtifactKind::MixAudio => "mixAudio",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable-storage references for all four artifacts of a finished job
///
/// Modeled as a struct rather than a map so a partial set cannot be
/// represented: a job either carries all four references (Done) or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRefs {
    pub midi: String,
    pub score: String,
    pub guide_audio: String,
    pub mix_audio: String,
}

impl OutputRefs {
    pub fn get(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Midi => &self.midi,
            ArtifactKind::Score => &self.score,
            ArtifactKind::GuideAudio => &self.guide_audio,
            ArtifactKind::MixAudio => &self.mix_audio,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        ArtifactKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

/// The unit of work: one source recording to be turned into a drum
/// accompaniment (MIDI, score, guide audio, and a final mix).
///
/// Structure shared between the job store (persists) and the runner
/// (drives status transitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: Uuid,
    /// Opaque identifier of the requesting guest session, if any
    pub owner_token: Option<String>,
    /// Durable-storage reference to the source audio
    pub input_ref: String,
    pub genre: String,
    /// Beats per minute; always positive
    pub tempo: u32,
    pub level: String,
    pub status: JobStatus,
    /// Populated only, and entirely, when the job reaches Done
    pub output_refs: Option<OutputRefs>,
    /// Populated only when the job reaches Error
    pub error_detail: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConversionJob {
    /// Creates a new Pending job record
    pub fn new(
        input_ref: impl Into<String>,
        genre: impl Into<String>,
        tempo: u32,
        level: impl Into<String>,
        owner_token: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_token,
            input_ref: input_ref.into(),
            genre: genre.into(),
            tempo,
            level: level.into(),
            status: JobStatus::Pending,
            output_refs: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
