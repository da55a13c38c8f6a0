//! Pipeline fault taxonomy
//!
//! Every stage fault is fatal to its run: the runner converts it into the
//! job's error detail and moves the job to Error. There are no retries
//! inside the pipeline; re-submission is a scheduler concern.

use drumline_core::ArtifactKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source audio could not be analyzed or no valid pattern exists
    /// for the given parameters
    #[error("drum generation failed: {0}")]
    GenerationFailed(String),

    /// The drum track could not be serialized to the MIDI path
    #[error("MIDI write failed: {0}")]
    WriteFailed(String),

    /// The notation tool was missing, exited non-zero, or produced no file
    #[error("score render failed: {0}")]
    ScoreRenderFailed(String),

    /// The synthesizer or its sound bank was missing, or produced no file
    #[error("guide audio render failed: {0}")]
    AudioRenderFailed(String),

    /// Source and guide audio could not be combined
    #[error("audio mix failed: {0}")]
    MixFailed(String),

    /// The input could not be fetched from durable storage; no stage ran
    #[error("input staging failed: {0}")]
    StagingFailed(String),

    /// One artifact upload failed; no output references were linked
    #[error("publish of {artifact} artifact failed: {detail}")]
    PublishFailed {
        artifact: ArtifactKind,
        detail: String,
    },

    /// An external process exceeded the stage wall-clock budget and was
    /// killed
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// Unexpected fault (e.g. a panic in the pipeline task)
    #[error("internal pipeline fault: {0}")]
    Internal(String),
}
